use std::collections::HashSet;
use std::io::{BufRead, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::{fs, io, thread};

use crossbeam_channel::{bounded, select, unbounded, Receiver, Sender};
use serde::{Deserialize, Serialize};

/// Named result store. Records accumulate in memory for the run report and,
/// when a spool is attached, are also appended line-by-line to a JSONL file
/// so a crash loses nothing already scraped.
pub struct Dataset {
    name: String,
    records: Mutex<Vec<serde_json::Value>>,
    spool: Option<Spool>,
}

struct Spool {
    path: PathBuf,
    tx_record: Sender<serde_json::Value>,
    tx_stop: Sender<()>,
    rx_done: Receiver<()>,
}

impl Dataset {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            records: Mutex::new(Vec::new()),
            spool: None,
        }
    }

    /// Attach a JSONL spool under `dir`, named `<dataset>-<run_id>.jsonl`.
    /// Writes happen on a dedicated thread fed over a channel.
    pub fn with_spool(mut self, dir: impl AsRef<Path>, run_id: &str) -> io::Result<Self> {
        fs::create_dir_all(dir.as_ref())?;
        let path = dir.as_ref().join(format!("{}-{run_id}.jsonl", self.name));
        let mut wtr = BufWriter::new(fs::File::create(&path)?);

        let (tx_record, rx_record) = unbounded::<serde_json::Value>();
        let (tx_stop, rx_stop) = bounded::<()>(1);
        let (tx_done, rx_done) = bounded::<()>(1);

        thread::spawn(move || loop {
            select! {
                recv(rx_stop) -> _ => {
                    // records queued behind the stop signal still land
                    for value in rx_record.try_iter() {
                        serde_json::to_writer(&mut wtr, &value).ok();
                        wtr.write_all(b"\n").ok();
                    }
                    wtr.flush().ok();
                    tx_done.send(()).ok();
                    break;
                }
                recv(rx_record) -> msg => {
                    if let Ok(value) = msg {
                        serde_json::to_writer(&mut wtr, &value).ok();
                        wtr.write_all(b"\n").ok();
                    }
                }
            }
        });

        self.spool = Some(Spool {
            path,
            tx_record,
            tx_stop,
            rx_done,
        });
        Ok(self)
    }

    /// Rebuild a dataset from a spool file of a previous run.
    pub fn from_spool(name: impl Into<String>, path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let file = fs::File::open(path.as_ref())?;
        let mut records = Vec::new();
        for line in io::BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            records.push(serde_json::from_str(&line)?);
        }
        Ok(Self {
            name: name.into(),
            records: Mutex::new(records),
            spool: None,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn push<T: Serialize>(&self, record: &T) -> anyhow::Result<()> {
        let value = serde_json::to_value(record)?;
        if let Some(spool) = &self.spool {
            spool.tx_record.send(value.clone()).ok();
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(value);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn records(&self) -> Vec<serde_json::Value> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// Stop the spool writer and wait for its final flush. Returns the
    /// spool path when one was attached.
    pub fn finalize(&self) -> Option<PathBuf> {
        let spool = self.spool.as_ref()?;
        spool.tx_stop.send(()).ok();
        spool.rx_done.recv().ok();
        Some(spool.path.clone())
    }

    /// Export all records as CSV, to `out` or stdout. Columns are the union
    /// of every record's keys in first-appearance order; list and nested
    /// fields are rendered as JSON text, absent and null fields as empty
    /// cells.
    pub fn export_csv(&self, conf: &CsvWriterConfig, out: Option<&Path>) -> anyhow::Result<()> {
        let records = self.records();
        let columns = columns(&records);
        if columns.is_empty() {
            log::warn!("dataset {} has nothing to export", self.name);
            return Ok(());
        }

        let builder = csv::WriterBuilder::from(conf);
        let mut wtr = match out {
            Some(path) => CsvWriter::File(builder.from_path(path)?),
            None => CsvWriter::Stdout(builder.from_writer(io::stdout())),
        };

        wtr.write_record(&columns)?;
        for record in &records {
            let row: Vec<String> = columns
                .iter()
                .map(|col| cell(record.get(col)))
                .collect();
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    }
}

fn columns(records: &[serde_json::Value]) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut columns = Vec::new();
    for record in records {
        if let Some(obj) = record.as_object() {
            for key in obj.keys() {
                if seen.insert(key.clone()) {
                    columns.push(key.clone());
                }
            }
        }
    }
    columns
}

fn cell(value: Option<&serde_json::Value>) -> String {
    match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CsvWriterConfig {
    #[serde(default = "default_csv_delimiter")]
    pub delimiter: char,
    #[serde(default = "default_csv_terminator")]
    pub terminator: CsvTerminator,
}

impl Default for CsvWriterConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            terminator: CsvTerminator::Any('\n'),
        }
    }
}

fn default_csv_delimiter() -> char {
    CsvWriterConfig::default().delimiter
}

fn default_csv_terminator() -> CsvTerminator {
    CsvWriterConfig::default().terminator
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub enum CsvTerminator {
    CRLF,
    Any(char),
}

impl From<CsvTerminator> for csv::Terminator {
    fn from(source: CsvTerminator) -> Self {
        match source {
            CsvTerminator::CRLF => Self::CRLF,
            CsvTerminator::Any(c) => Self::Any(c as u8),
        }
    }
}

impl From<&CsvWriterConfig> for csv::WriterBuilder {
    fn from(c: &CsvWriterConfig) -> Self {
        let mut builder = csv::WriterBuilder::new();
        builder.delimiter(c.delimiter as u8);
        builder.terminator(c.terminator.into());
        builder
    }
}

enum CsvWriter {
    File(csv::Writer<fs::File>),
    Stdout(csv::Writer<io::Stdout>),
}

impl CsvWriter {
    fn flush(&mut self) -> io::Result<()> {
        match self {
            Self::File(wtr) => wtr.flush(),
            Self::Stdout(wtr) => wtr.flush(),
        }
    }

    fn write_record<I, T>(&mut self, record: I) -> csv::Result<()>
    where
        I: IntoIterator<Item = T>,
        T: AsRef<[u8]>,
    {
        match self {
            Self::File(wtr) => wtr.write_record(record),
            Self::Stdout(wtr) => wtr.write_record(record),
        }
    }
}
