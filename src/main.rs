fn main() {
    conch::cli::run();
}
