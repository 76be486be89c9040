use ouro::cli;

fn main() {
    cli::run();
}
