fn main() {
    if let Err(err) = taximeter_lib::run() {
        eprintln!("taximeter failed: {err:#}");
        std::process::exit(1);
    }
}
