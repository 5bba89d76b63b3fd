//! Single-line board codes for sharing a game between machines.

use base64::{engine::general_purpose::STANDARD_NO_PAD, Engine as _};
use thiserror::Error;
use tile_merge_core::SessionSnapshot;

const CODE_DOMAIN: &str = "tile-merge";
const CODE_VERSION: &str = "v1";

/// Identifier prefix emitted before the encoded board payload.
pub(crate) const CODE_HEADER: &str = "tile-merge:v1";
/// Delimiter used to separate the prefix, grid dimensions and payload.
const FIELD_DELIMITER: char = ':';

/// Encodes the snapshot into a single-line string suitable for copy and paste.
pub(crate) fn encode(snapshot: &SessionSnapshot) -> Result<String, BoardCodeError> {
    let json = serde_json::to_vec(snapshot).map_err(BoardCodeError::InvalidPayload)?;
    let encoded = STANDARD_NO_PAD.encode(json);
    let size = snapshot.grid.len();
    Ok(format!("{CODE_HEADER}:{size}x{size}:{encoded}"))
}

/// Decodes a snapshot from the provided board code.
pub(crate) fn decode(value: &str) -> Result<SessionSnapshot, BoardCodeError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BoardCodeError::Empty);
    }

    let mut parts = trimmed.split(FIELD_DELIMITER);
    let domain = parts.next().ok_or(BoardCodeError::MissingPrefix)?;
    let version = parts.next().ok_or(BoardCodeError::MissingVersion)?;
    let dimensions = parts.next().ok_or(BoardCodeError::MissingDimensions)?;
    let payload = parts.next().ok_or(BoardCodeError::MissingPayload)?;

    if domain != CODE_DOMAIN {
        return Err(BoardCodeError::InvalidPrefix(domain.to_owned()));
    }
    if version != CODE_VERSION {
        return Err(BoardCodeError::UnsupportedVersion(version.to_owned()));
    }

    let size = parse_dimensions(dimensions)?;
    let bytes = STANDARD_NO_PAD
        .decode(payload.as_bytes())
        .map_err(BoardCodeError::InvalidEncoding)?;
    let snapshot: SessionSnapshot =
        serde_json::from_slice(&bytes).map_err(BoardCodeError::InvalidPayload)?;

    let rows = snapshot.grid.len();
    if rows != size || snapshot.grid.iter().any(|row| row.len() != size) {
        return Err(BoardCodeError::DimensionMismatch {
            declared: size,
            rows,
        });
    }
    Ok(snapshot)
}

/// Errors that can occur while decoding board codes.
#[derive(Debug, Error)]
pub(crate) enum BoardCodeError {
    /// The provided string was empty or contained only whitespace.
    #[error("board code was empty")]
    Empty,
    /// The prefix segment was missing.
    #[error("board code is missing the prefix")]
    MissingPrefix,
    /// The version segment was missing.
    #[error("board code is missing the version")]
    MissingVersion,
    /// The grid dimensions were missing.
    #[error("board code is missing the grid dimensions")]
    MissingDimensions,
    /// The payload segment was missing.
    #[error("board code is missing the payload")]
    MissingPayload,
    /// The code used an unexpected prefix segment.
    #[error("board code prefix '{0}' is not supported")]
    InvalidPrefix(String),
    /// The code used an unsupported version identifier.
    #[error("board code version '{0}' is not supported")]
    UnsupportedVersion(String),
    /// The grid dimensions could not be parsed, or describe a non-square grid.
    #[error("could not parse grid dimensions '{0}'")]
    InvalidDimensions(String),
    /// The declared dimensions disagree with the decoded grid.
    #[error("board code declares a {declared}x{declared} grid but holds {rows} rows")]
    DimensionMismatch {
        /// Side length named in the header.
        declared: usize,
        /// Rows found in the payload.
        rows: usize,
    },
    /// The base64 payload could not be decoded.
    #[error("could not decode board payload: {0}")]
    InvalidEncoding(#[source] base64::DecodeError),
    /// The payload could not be serialised or deserialised.
    #[error("could not parse board payload: {0}")]
    InvalidPayload(#[source] serde_json::Error),
}

fn parse_dimensions(dimensions: &str) -> Result<usize, BoardCodeError> {
    let invalid = || BoardCodeError::InvalidDimensions(dimensions.to_owned());
    let (columns, rows) = dimensions.split_once(['x', 'X']).ok_or_else(invalid)?;

    let columns = columns.trim().parse::<usize>().map_err(|_| invalid())?;
    let rows = rows.trim().parse::<usize>().map_err(|_| invalid())?;

    if columns == 0 || columns != rows {
        return Err(invalid());
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tile_merge_core::{Position, Tile, TileId, TileValue};

    fn snapshot() -> SessionSnapshot {
        let mut grid = vec![vec![None; 3]; 3];
        grid[1][2] = Some(Tile::spawned(
            TileId::new(4),
            TileValue::FOUR,
            Position::new(1, 2),
        ));
        SessionSnapshot {
            grid,
            score: 36,
            best_score: 120,
            is_game_over: false,
            is_won: false,
            can_undo: true,
            keep_playing: false,
        }
    }

    #[test]
    fn encoded_code_decodes_to_same_board() {
        let original = snapshot();
        let code = encode(&original).expect("snapshot encodes");
        assert!(code.starts_with(&format!("{CODE_HEADER}:3x3:")));

        let decoded = decode(&code).expect("code decodes");
        assert_eq!(decoded, original);
    }

    #[test]
    fn rejects_foreign_prefix_and_version() {
        assert!(matches!(
            decode("puzzle:v1:3x3:abc"),
            Err(BoardCodeError::InvalidPrefix(prefix)) if prefix == "puzzle"
        ));
        assert!(matches!(
            decode("tile-merge:v9:3x3:abc"),
            Err(BoardCodeError::UnsupportedVersion(_))
        ));
        assert!(matches!(decode("   "), Err(BoardCodeError::Empty)));
    }

    #[test]
    fn rejects_header_that_disagrees_with_payload() {
        let code = encode(&snapshot()).expect("snapshot encodes");
        let tampered = code.replacen(":3x3:", ":4x4:", 1);
        assert!(matches!(
            decode(&tampered),
            Err(BoardCodeError::DimensionMismatch { declared: 4, rows: 3 })
        ));
        assert!(matches!(
            decode("tile-merge:v1:3x4:abc"),
            Err(BoardCodeError::InvalidDimensions(_))
        ));
    }
}
