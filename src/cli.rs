use argh::FromArgs;
use std::path::PathBuf;

/// Read numeric displays out of videos with OCR
#[derive(FromArgs, Debug)]
pub struct Args {
    #[argh(subcommand)]
    pub command: Command,
}

#[derive(FromArgs, Debug)]
#[argh(subcommand)]
pub enum Command {
    Setup(SetupArgs),
    Prepare(PrepareArgs),
    Read(ReadArgs),
}

/// locate Tesseract and fetch the language data if missing
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "setup")]
pub struct SetupArgs {
    /// job file
    #[argh(option, default = "PathBuf::from(\"job.json\")")]
    pub job: PathBuf,
}

/// write ROI previews of the first frame of each video
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "prepare")]
pub struct PrepareArgs {
    /// job file
    #[argh(option, default = "PathBuf::from(\"job.json\")")]
    pub job: PathBuf,
}

/// run the batch and export the readings
#[derive(FromArgs, Debug)]
#[argh(subcommand, name = "read")]
pub struct ReadArgs {
    /// job file
    #[argh(option, default = "PathBuf::from(\"job.json\")")]
    pub job: PathBuf,

    /// output folder, defaults to a new timestamped folder under runs/
    #[argh(option)]
    pub output: Option<PathBuf>,
}
