fn main() {
    if let Err(err) = toolprobe::cli::main() {
        eprintln!("❌ {err}");
        std::process::exit(1);
    }
}
