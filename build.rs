fn main() {
    if let Err(err) = built::write_built_file() {
        eprintln!("failed to collect build-time information: {err}");
        std::process::exit(1);
    }
}
