fn main() {
    if let Err(err) = graphview::run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}
