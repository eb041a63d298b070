use {
    anyhow::{
        anyhow,
        Result,
    },
    serde::{
        de::DeserializeOwned,
        Serialize,
    },
    std::{
        fs::{
            create_dir_all,
            read_to_string,
            File,
        },
        io::Write,
        path::{
            Path,
            PathBuf,
        },
    },
};

pub const RUN_CONFIG_FILE: &str = "config.ron";
pub const RUN_SUMMARY_FILE: &str = "summary.ron";

/// Read a RON file into `T`.
pub fn read_config<T: DeserializeOwned>(path: &dyn AsRef<Path>) -> Result<T> {
    let path = path.as_ref();
    let text = read_to_string(path)
        .map_err(|e| anyhow!("cannot read config {}: {e}", path.display()))?;
    Ok(ron::from_str(&text)?)
}

/// Write `value` as pretty RON, replacing the file if it exists.
pub fn write_config<T: Serialize>(
    path: &dyn AsRef<Path>,
    value: &T,
) -> Result<()> {
    File::create(path)?.write_all(
        ron::ser::to_string_pretty(
            value,
            ron::ser::PrettyConfig::default(),
        )?.as_bytes()
    )?;
    Ok(())
}

/// Create the directory `root/run_tag` for the output of a run.
///
/// Fails if the directory already holds the config of an earlier run, so no
/// data gets overwritten.
pub fn prepare_run_directory(
    root: &dyn AsRef<Path>,
    run_tag: &str,
) -> Result<PathBuf> {
    let path = root.as_ref().join(run_tag);

    if path.join(RUN_CONFIG_FILE).try_exists()? {
        Err(anyhow!(concat!(
            "A run config already exists in this directory!\n",
            "I am assuming I would be overwriting existing data!",
        )))?
    }

    create_dir_all(path.as_path())?;
    Ok(path)
}
