use log::info;
use oscar_fmt_xml::oscar_core::{Diagnostic, Outcome, Time, Tracer};
use std::{
    env::current_dir,
    fs::{File, create_dir, rename},
    io,
    path::{Path, PathBuf},
};

/// Writes the diagnostics of a run as a gzipped CSV file.
///
/// The file is written to `traces_NN/.temp/` while the scenario runs,
/// then moved to `traces_NN/successes/` or `traces_NN/failures/` according to the outcome.
#[derive(Debug)]
pub struct TracePrinter {
    folder: PathBuf,
    filename: String,
    writer: Option<csv::Writer<flate2::write::GzEncoder<File>>>,
}

impl TracePrinter {
    const FOLDER: &str = "traces";
    const TEMP: &str = ".temp";
    const SUCCESSES: &str = "successes";
    const FAILURES: &str = "failures";
    const HEADER: [&str; 4] = ["Time", "Element", "State", "Description"];

    /// Creates a fresh `traces_NN` folder in the current directory.
    pub fn new(name: &str) -> io::Result<Self> {
        Self::in_dir(&current_dir()?, name)
    }

    /// Creates a fresh `traces_NN` folder in `dir`.
    pub fn in_dir(dir: &Path, name: &str) -> io::Result<Self> {
        let mut folder = dir.to_owned();
        for i in 0.. {
            folder.push(format!("{}_{i:02}", Self::FOLDER));
            match create_dir(&folder) {
                Ok(()) => break,
                Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
                    folder.pop();
                }
                Err(err) => return Err(err),
            }
        }
        for sub in [Self::TEMP, Self::SUCCESSES, Self::FAILURES] {
            create_dir(folder.join(sub))?;
        }
        info!("writing traces to '{}'", folder.display());
        Ok(Self {
            folder,
            filename: format!("{name}.csv.gz"),
            writer: None,
        })
    }

    /// The `traces_NN` folder.
    pub fn folder(&self) -> &Path {
        &self.folder
    }

    fn writer(&mut self) -> io::Result<&mut csv::Writer<flate2::write::GzEncoder<File>>> {
        self.writer
            .as_mut()
            .ok_or_else(|| io::Error::other("trace printer used before init"))
    }
}

impl Tracer for TracePrinter {
    fn init(&mut self) -> io::Result<()> {
        let path = self.folder.join(Self::TEMP).join(&self.filename);
        let file = File::create_new(&path)?;
        let enc = flate2::GzBuilder::new()
            .filename(self.filename.trim_end_matches(".gz"))
            .write(file, flate2::Compression::fast());
        let mut writer = csv::WriterBuilder::new().from_writer(enc);
        writer.write_record(Self::HEADER)?;
        self.writer = Some(writer);
        Ok(())
    }

    fn trace(&mut self, time: Time, diagnostics: &[Diagnostic]) -> io::Result<()> {
        let time = time.to_string();
        let writer = self.writer()?;
        for diagnostic in diagnostics {
            let state = diagnostic.state.to_string();
            writer.write_record([
                time.as_str(),
                diagnostic.path.as_str(),
                state.as_str(),
                diagnostic.description.as_str(),
            ])?;
        }
        Ok(())
    }

    fn finalize(mut self, outcome: &Outcome) -> io::Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer
                .into_inner()
                .map_err(|err| err.into_error())?
                .try_finish()?;
        }
        let folder = match outcome {
            Outcome::Success => Self::SUCCESSES,
            Outcome::Failure(_) | Outcome::Running => Self::FAILURES,
        };
        let destination = self.folder.join(folder).join(&self.filename);
        rename(self.folder.join(Self::TEMP).join(&self.filename), &destination)?;
        info!("trace saved to '{}'", destination.display());
        Ok(())
    }
}
