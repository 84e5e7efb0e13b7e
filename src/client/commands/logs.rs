use crate::client::request;
use crate::tprint;
use anyhow::Result;

pub fn logs_cmd(base_url: &str, name: &str, offset: usize, lines: usize) -> Result<()> {
    let page = request::logs(base_url, name, offset, lines)?;
    for line in &page.lines {
        println!("{}", line);
    }
    if page.rotated {
        tprint!("(log rotated since last read)");
    }
    Ok(())
}
