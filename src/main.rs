use apm_server_proxy::entry;
use apm_server_proxy::error::AppResult;

fn main() -> AppResult<()> {
    entry::run()
}
