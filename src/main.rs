fn main() {
    if let Err(err) = scrapebench_lib::run() {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
