use clap::Parser;

/// Tabulates the ranked ballots of an award vote and prepares the reveal.
#[derive(Parser, Debug, Clone, Default)]
#[clap(author, version, about, long_about = None)]
pub struct Args {
    /// (file path, optional) The JSON configuration of the contest: name, ballot file,
    /// movie catalog and rules. See the manual of awards_rcv for the format.
    #[clap(short, long, value_parser)]
    pub config: Option<String>,
    /// (file path) A reference summary in JSON format. If provided, awardtally will
    /// check that the tabulated output matches the reference.
    #[clap(short, long, value_parser)]
    pub reference: Option<String>,

    /// (file path, 'stdout' or empty) If specified, the summary of the tabulation will be written
    /// in JSON format to the given location. Setting this option overrides the path that may be
    /// specified in the configuration.
    #[clap(short, long, value_parser)]
    pub out: Option<String>,

    /// (file path or empty) The ballot export, as a JSON array of ballot records. Setting this
    /// option overrides the ballot file of the configuration.
    #[clap(short, long, value_parser)]
    pub input: Option<String>,

    /// (default 5) The number of favorites ranked on each ballot.
    #[clap(long, value_parser)]
    pub rank_count: Option<usize>,

    // Other arguments
    /// If passed as an argument, will turn on verbose logging to the standard output.
    #[clap(long, takes_value = false)]
    pub verbose: bool,
}
