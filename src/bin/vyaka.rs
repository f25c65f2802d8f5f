fn main() {
    vyaka::cli::run();
}
