use super::Host;
use super::common::{Common, CommonArgs};
use crate::Result;
use crate::tools::serve::serve;
use clap::Parser;
use tokio::io::{BufReader, stdin, stdout};

#[derive(Parser, Debug)]
pub struct ServeArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

/// Answer line-delimited JSON tool requests on stdin until it closes
pub async fn serve_stdio<H: Host>(host: &mut H, args: &ServeArgs) -> Result<()> {
    let common = Common::new(host, &args.common)?;
    log::info!(target: "     serve", "Serving tool requests on stdin");
    serve(&common.toolbox, BufReader::new(stdin()), stdout()).await
}
