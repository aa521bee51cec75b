use clap::Parser;

#[tokio::main]
async fn main() -> color_eyre::Result<()> {
	color_eyre::install()?;

	let args = zcs_api::Args::parse();

	zcs_api::run(args).await
}
