use clap::Parser;
use topk_tokens::TopkTokensOptions;
use tracing::Level;

#[derive(Debug, Parser)]
#[command(version, about, long_about = None)]
pub(crate) struct Cli {
    /// The host to listen on.
    #[arg(long, default_value = "0.0.0.0:8080")]
    host: String,

    /// The number of workers to use for the selection requests.
    #[arg(long, default_value = "1")]
    num_workers: usize,

    /// The default maximum number of top and bottom activations returned per sample.
    #[arg(long, default_value = "10")]
    max_k: usize,

    /// The default name of the first (outer) dimension.
    #[arg(long, default_value = "Layer")]
    first_dimension_name: String,

    /// The default name of the third (inner) dimension.
    #[arg(long, default_value = "Neuron")]
    third_dimension_name: String,

    /// The maximum level of the logs.
    #[arg(long, value_enum, default_value = "info")]
    log_level: LogLevel,
}

impl Cli {
    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn num_workers(&self) -> usize {
        self.num_workers
    }

    pub fn log_level(&self) -> Level {
        match self.log_level {
            LogLevel::Error => Level::ERROR,
            LogLevel::Warn => Level::WARN,
            LogLevel::Info => Level::INFO,
            LogLevel::Debug => Level::DEBUG,
            LogLevel::Trace => Level::TRACE,
        }
    }

    /// Get the [`TopkTokensOptions`] used for the requests that don't override them.
    pub fn options(&self) -> TopkTokensOptions {
        TopkTokensOptions {
            max_k: self.max_k,
            first_dimension_name: self.first_dimension_name.clone(),
            third_dimension_name: self.third_dimension_name.clone(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone, clap::ValueEnum)]
#[clap(rename_all = "lowercase")]
pub(crate) enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;
    use tracing::Level;

    #[test]
    fn test_cli_defaults() {
        let cli = Cli::parse_from(["topk-tokens-serve"]);
        assert_eq!(cli.host(), "0.0.0.0:8080");
        assert_eq!(cli.num_workers(), 1);
        assert_eq!(cli.log_level(), Level::INFO);
        let options = cli.options();
        assert_eq!(options.max_k, 10);
        assert_eq!(options.first_dimension_name, "Layer");
        assert_eq!(options.third_dimension_name, "Neuron");
    }

    #[test]
    fn test_cli_overrides() {
        let cli = Cli::parse_from([
            "topk-tokens-serve",
            "--max-k",
            "3",
            "--first-dimension-name",
            "Block",
            "--log-level",
            "debug",
            "--num-workers",
            "4",
        ]);
        assert_eq!(cli.num_workers(), 4);
        assert_eq!(cli.log_level(), Level::DEBUG);
        let options = cli.options();
        assert_eq!(options.max_k, 3);
        assert_eq!(options.first_dimension_name, "Block");
    }
}
