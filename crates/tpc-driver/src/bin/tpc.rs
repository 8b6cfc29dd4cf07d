fn main() {
    std::process::exit(tpc_driver::main());
}
