fn main() {
    if let Err(err) = epidash_lib::run() {
        eprintln!("epidash: {}", err);
        std::process::exit(1);
    }
}
