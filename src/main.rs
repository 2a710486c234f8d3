fn main() {
    if let Err(e) = trip_pantry_lib::run() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}
