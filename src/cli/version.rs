/// Display version information
pub fn execute() {
    println!("silentmatch {}", env!("CARGO_PKG_VERSION"));
    println!("Operator CLI for the SilentMatch fraud consortium node");
}
