use crate::{Error, Result};
use std::{
  fs, io,
  path::{Path, PathBuf},
};
use zip::{write::FileOptions, CompressionMethod, ZipArchive, ZipWriter};

/// Packages a directory into a single zip archive at `dest`. Entry names
/// are relative to `src` with `/` separators, so the archive extracts to
/// the same tree on the dispatch side.
pub fn zip_dir(src: &Path, dest: &Path) -> Result<()> {
  let file = fs::File::create(dest).map_err(Error::zip_failed)?;
  let mut writer = ZipWriter::new(file);
  let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

  let mut stack = vec![src.to_path_buf()];

  while let Some(dir) = stack.pop() {
    let entries = fs::read_dir(&dir).map_err(Error::zip_failed)?;

    for entry in entries {
      let entry = entry.map_err(Error::zip_failed)?;
      let path = entry.path();
      let name = entry_name(src, &path)?;

      if path.is_dir() {
        writer
          .add_directory(format!("{}/", name), options)
          .map_err(Error::zip_failed)?;
        stack.push(path);
      } else {
        writer.start_file(name, options).map_err(Error::zip_failed)?;
        let mut reader = fs::File::open(&path).map_err(Error::zip_failed)?;
        io::copy(&mut reader, &mut writer).map_err(Error::zip_failed)?;
      }
    }
  }

  writer.finish().map_err(Error::zip_failed)?;

  Ok(())
}

/// Extracts a zip archive into `dest`, creating it if needed.
pub fn extract_zip(archive: &Path, dest: &Path) -> Result<()> {
  let file = fs::File::open(archive).map_err(Error::zip_failed)?;
  let mut zip = ZipArchive::new(file).map_err(Error::zip_failed)?;

  zip.extract(dest).map_err(Error::zip_failed)?;

  Ok(())
}

fn entry_name(base: &Path, path: &PathBuf) -> Result<String> {
  let relative = path
    .strip_prefix(base)
    .map_err(|_| Error::zip_failed(format!("Entry {:?} escapes {:?}", path, base)))?;

  let parts: Vec<String> = relative
    .components()
    .map(|c| c.as_os_str().to_string_lossy().into_owned())
    .collect();

  Ok(parts.join("/"))
}
