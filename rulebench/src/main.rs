fn main() {
    if let Err(e) = rulebench::run() {
        eprintln!("Error: {e:#}");
        std::process::exit(2);
    }
}
