use super::Parser;

#[derive(Parser, Debug)]
#[command(about = "Issues and rotates access/refresh token pairs")]
pub struct Cli {
    /// Path to a settings file, without or with the `.toml` extension.
    #[arg(long)]
    pub settings: Option<String>,
}
