use super::models::{NewSong, SongTable};
use super::{Database, Result};
use rusqlite::params_from_iter;
use rusqlite::types::Value;

impl Database {
    /// Read every row of the songs table as untyped cells, in storage order.
    pub fn load_songs(&self) -> Result<SongTable> {
        let mut stmt = self.conn.prepare("SELECT * FROM songs")?;
        let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = columns.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get::<_, Value>(i))
                    .collect::<rusqlite::Result<Vec<_>>>()
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(SongTable { columns, rows })
    }

    /// Insert one song. Returns its row id.
    pub fn insert_song(&self, song: &NewSong) -> Result<i64> {
        Self::insert_song_row(&self.conn, song)
    }

    /// Insert a batch of songs in a single transaction.
    pub fn import_songs(&self, songs: &[NewSong]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        for song in songs {
            Self::insert_song_row(&tx, song)?;
        }
        tx.commit()?;
        Ok(songs.len())
    }

    fn insert_song_row(conn: &rusqlite::Connection, song: &NewSong) -> Result<i64> {
        if song.columns.is_empty() {
            conn.execute("INSERT INTO songs DEFAULT VALUES", [])?;
            return Ok(conn.last_insert_rowid());
        }

        // Column names come from the fixed SONG_COLUMNS list, never from input.
        let names: Vec<&str> = song.columns.iter().map(|(c, _)| *c).collect();
        let placeholders: Vec<String> = (1..=names.len()).map(|i| format!("?{i}")).collect();
        let sql = format!(
            "INSERT INTO songs ({}) VALUES ({})",
            names.join(", "),
            placeholders.join(", ")
        );

        conn.execute(&sql, params_from_iter(song.columns.iter().map(|(_, v)| v)))?;
        Ok(conn.last_insert_rowid())
    }

    pub fn song_count(&self) -> Result<i64> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM songs", [], |row| row.get(0))?;
        Ok(count)
    }
}
