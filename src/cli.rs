use camino::Utf8PathBuf;
use clap::Parser;
use simple_error::{bail, SimpleResult};

#[derive(Parser)]
#[command(
    author,
    version,
    about,
    help_template = "\
{before-help}{name} {version}
{author-with-newline}{about-with-newline}
{usage-heading} {usage}

{all-args}{after-help}"
)]
#[clap(rename_all = "kebab_case")]
pub struct Settings {
    /// Min. mapping quality
    #[arg(short = 'q', long = "qual", value_name = "INT", default_value_t = 1)]
    pub min_map_qual: u8,

    /// Min. clipping length
    #[arg(short = 'c', long = "clip", value_name = "INT", default_value_t = 25)]
    pub min_clip: u32,

    /// Min. split-read support for a breakpoint and for a cluster-forming edge
    #[arg(short = 's', long = "split", value_name = "INT", default_value_t = 3)]
    pub min_split: u32,

    /// Min. contig length; shorter contigs are skipped entirely
    #[arg(long, value_name = "INT", default_value_t = 10_000_000)]
    pub min_chr_len: u64,

    /// Min. segment size
    #[arg(short = 'i', long = "minsize", value_name = "INT", default_value_t = 100)]
    pub min_segment_size: u32,

    /// Max. segment size
    #[arg(short = 'j', long = "maxsize", value_name = "INT", default_value_t = 10_000)]
    pub max_segment_size: u32,

    /// Max. fractional tumor-in-normal contamination
    #[arg(short = 'n', long = "contam", value_name = "FLOAT", default_value_t = 0.0)]
    pub contam: f64,

    /// Genome reference in FASTA format, with a .fai companion index
    #[arg(short = 'g', long = "genome", value_name = "FILE")]
    pub genome: Utf8PathBuf,

    /// Alignment file for the matched control sample in BAM or CRAM format
    #[arg(short = 'm', long = "matched", value_name = "FILE")]
    pub control: Utf8PathBuf,

    /// Write run statistics to this file in json format
    #[arg(long, value_name = "FILE")]
    pub stats: Option<Utf8PathBuf>,

    /// Turn on extra debug logging
    #[arg(long)]
    pub debug: bool,

    /// Alignment file for the tumor sample in BAM or CRAM format
    #[arg(value_name = "TUMOR")]
    pub tumor: Utf8PathBuf,
}

/// Validate settings beyond what clap can check on its own
///
fn validate_settings_impl(settings: &Settings) -> SimpleResult<()> {
    fn check_required_filename(filename: &Utf8PathBuf, label: &str) -> SimpleResult<()> {
        if filename.as_str().is_empty() {
            bail!("Must specify {label} file");
        }
        if !filename.exists() {
            bail!("Can't find specified {label} file: '{filename}'");
        }
        Ok(())
    }

    if settings.min_segment_size == 0 {
        bail!("--minsize argument must be greater than 0");
    }
    if settings.max_segment_size <= settings.min_segment_size {
        bail!("--maxsize argument must be greater than --minsize");
    }
    if settings.contam < 0.0 {
        bail!("--contam argument must not be negative");
    }

    check_required_filename(&settings.genome, "reference")?;
    check_required_filename(&settings.control, "control alignment")?;
    check_required_filename(&settings.tumor, "tumor alignment")?;

    let fai_filename = Utf8PathBuf::from(format!("{}.fai", settings.genome));
    if !fai_filename.exists() {
        bail!("Can't find reference fasta index file: '{fai_filename}'");
    }

    Ok(())
}

/// Validate settings and update to parameters that can't be processed automatically by clap.
///
pub fn validate_and_fix_settings(settings: Settings) -> Settings {
    match validate_settings_impl(&settings) {
        Ok(()) => settings,
        Err(msg) => {
            eprintln!("Invalid command-line setting: {}", msg);
            std::process::exit(exitcode::USAGE);
        }
    }
}

pub fn parse_settings() -> Settings {
    Settings::parse()
}
