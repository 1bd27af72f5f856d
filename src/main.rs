fn main() {
    if let Err(err) = netmap_layout::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
