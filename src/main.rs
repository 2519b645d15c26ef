use std::process;

fn main() {
    if let Err(err) = electra::app::run() {
        eprintln!("fatal: {err}");
        process::exit(1);
    }
}
