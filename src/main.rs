use std::error::Error;

fn main() -> Result<(), Box<dyn Error>> {
    nakshatra::cli::main()
}
