use blake2::{Blake2b512, Digest};
use std::fs;
use std::io::{BufReader, Read};
use std::path::Path;

/// Hex encoded BLAKE2b-512 digest of the whole file.
pub fn hash_file(file: &Path) -> std::io::Result<String> {
    let reader = BufReader::new(fs::File::open(file)?);
    hasher(reader)
}

fn hasher<R: Read>(mut reader: BufReader<R>) -> std::io::Result<String> {
    let mut hasher = Blake2b512::new();
    let mut buffer = [0; 8192];

    loop {
        let count = reader.read(&mut buffer)?;
        if count == 0 {
            break;
        }
        hasher.update(&buffer[..count]);
    }

    Ok(hex::encode(hasher.finalize()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_same_contents_same_hash() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        fs::write(&first, b"identical bytes").unwrap();
        fs::write(&second, b"identical bytes").unwrap();

        let hash = hash_file(&first).unwrap();
        assert_eq!(hash, hash_file(&second).unwrap());
        assert_eq!(hash.len(), 128);
    }

    #[test]
    fn test_different_contents_different_hash() {
        let temp_dir = TempDir::new().unwrap();
        let first = temp_dir.path().join("first");
        let second = temp_dir.path().join("second");
        fs::write(&first, b"aaaa").unwrap();
        fs::write(&second, b"aaab").unwrap();

        assert_ne!(hash_file(&first).unwrap(), hash_file(&second).unwrap());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        assert!(hash_file(&temp_dir.path().join("missing")).is_err());
    }
}
