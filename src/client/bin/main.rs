use overseer::client::cli::cli_app;
use overseer::texit;

fn main() {
    if let Err(e) = cli_app() {
        texit!(e);
    }
}
