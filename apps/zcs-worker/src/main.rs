use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = zcs_worker::Args::parse();

	zcs_worker::run(args).await
}
