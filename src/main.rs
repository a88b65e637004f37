fn main() {
    if let Err(err) = tree_inventory::run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
