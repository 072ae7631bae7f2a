
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Byte value terminating each loaded sequence; must not occur in the input.
pub const SEQ_TERMINATOR: u8 = 1;

/// Loads a minimal FASTA subset into one byte array: lines starting with '>'
/// delimit sequences (header content ignored), all other lines concatenate
/// into the body, empty lines are skipped. Each sequence is reversed and
/// terminated with [SEQ_TERMINATOR], which makes the online right-extension
/// of the result produce the BWT of the forward sequences.
/// Returns the packed text and the number of sequences.
pub fn load_fasta(path: impl AsRef<Path>) -> std::io::Result<(Vec<u8>, u64)> {
    let reader = BufReader::new(File::open(path)?);
    let mut text: Vec<u8> = vec![];
    let mut current: Vec<u8> = vec![];
    let mut num_seqs: u64 = 0;
    for line in reader.lines() {
        let line = line?;
        let bytes = line.as_bytes();
        if bytes.is_empty() {
            continue;
        }
        if bytes[0] == b'>' {
            if !current.is_empty() {
                flush_sequence(&mut text, &mut current);
                num_seqs += 1;
            }
        } else {
            current.extend_from_slice(bytes);
        }
    }
    flush_sequence(&mut text, &mut current);
    num_seqs += 1;
    Ok((text, num_seqs))
}

fn flush_sequence(text: &mut Vec<u8>, current: &mut Vec<u8>) {
    current.reverse();
    text.append(current);
    text.push(SEQ_TERMINATOR);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_temp(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_single_sequence() {
        let file = write_temp(">seq1\nBANANA\n");
        let (text, n) = load_fasta(file.path()).unwrap();
        assert_eq!(n, 1);
        assert_eq!(text, b"ANANAB\x01".to_vec());
    }

    #[test]
    fn test_multi_line_body_and_empty_lines() {
        let file = write_temp(">s\nAB\n\nCD\n\n");
        let (text, n) = load_fasta(file.path()).unwrap();
        assert_eq!(n, 1);
        assert_eq!(text, b"DCBA\x01".to_vec());
    }

    #[test]
    fn test_two_sequences_headers_ignored() {
        let file = write_temp(">first header text\nAC\n>second\nGT\n");
        let (text, n) = load_fasta(file.path()).unwrap();
        assert_eq!(n, 2);
        assert_eq!(text, b"CA\x01TG\x01".to_vec());
    }

    #[test]
    fn test_missing_file_is_an_error() {
        assert!(load_fasta("/this/path/does/not/exist.fa").is_err());
    }
}
