use clap::Parser;

/// Simulates the outcome of a ranked-choice election from polling numbers.
#[derive(Parser, Debug, Clone)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path) The scenario in JSON: candidates, support, exhaustion rates, ideologies
    /// and modifiers. See the documentation for the format.
    #[clap(short, long, value_parser)]
    pub config: String,

    /// (file path, optional) A CSV file with polling numbers. If specified, it replaces the
    /// poll sources of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the simulation will be written
    /// in JSON format to the given location.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path) A reference file containing the outcome of a simulation in JSON format. If
    /// provided, rcvsim will check that the computed summary matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path) If specified, the round by round results are exported in CSV to this location.
    #[clap(long, value_parser)]
    pub csv_out: Option<String>,

    /// Only exports the first round, every third round and the last two rounds in CSV.
    #[clap(long, takes_value = false)]
    pub abridged: bool,

    /// (NAME=VALUE, repeatable) Sets the first-choice support of a candidate and rescales
    /// the other candidates to keep a total of 100.
    #[clap(long, value_parser)]
    pub adjust: Option<Vec<String>>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
