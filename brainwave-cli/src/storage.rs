//! Local persistence: practice-video catalog and encrypted session history
//! in a SQLite database.

use std::path::{Path, PathBuf};

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use chrono::{DateTime, Duration, TimeZone, Utc};
use rand::RngCore;
use rusqlite::{params, Connection};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use brainwave_core::{AnalysisReport, AudioDescriptors};

/// A saved practice video reference (YouTube link plus metadata).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoEntry {
    pub id: String,
    pub title: String,
    pub description: String,
    pub youtube_url: String,
    /// Free-form category; the UI conventions are "articulation",
    /// "reading", "writing", and "podcast".
    pub exercise_type: String,
    pub date_added: String,
}

/// One recorded practice session, decrypted for display.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionItem {
    pub id: String,
    pub created_at: String,
    pub transcript: String,
    pub descriptors: AudioDescriptors,
    pub feedback_count: usize,
}

#[derive(Debug, Clone)]
pub struct LocalStore {
    db_path: PathBuf,
    cipher: TextCipher,
}

/// AES-256-GCM over a key derived from the machine identity and the DB
/// path. Protects transcripts at rest from casual file inspection; not a
/// defense against an attacker running as the same user.
#[derive(Debug, Clone)]
struct TextCipher {
    key: [u8; 32],
}

impl TextCipher {
    fn new(scope: &Path) -> Self {
        let username = std::env::var("USERNAME")
            .or_else(|_| std::env::var("USER"))
            .unwrap_or_default();
        let host = std::env::var("COMPUTERNAME")
            .or_else(|_| std::env::var("HOSTNAME"))
            .unwrap_or_default();
        let material = format!(
            "{username}|{host}|{}|brainwave-history-v1",
            scope.to_string_lossy()
        );
        let mut hasher = Sha256::new();
        hasher.update(material.as_bytes());
        let digest = hasher.finalize();
        let mut key = [0u8; 32];
        key.copy_from_slice(&digest[..32]);
        Self { key }
    }

    fn encrypt(&self, plain: &str) -> Result<String, String> {
        if plain.is_empty() {
            return Ok(String::new());
        }
        let cipher = Aes256Gcm::new_from_slice(&self.key).map_err(|e| e.to_string())?;
        let mut nonce_bytes = [0u8; 12];
        rand::rngs::OsRng.fill_bytes(&mut nonce_bytes);
        let nonce = Nonce::from_slice(&nonce_bytes);
        let encrypted = cipher
            .encrypt(nonce, plain.as_bytes())
            .map_err(|e| e.to_string())?;
        let mut out = Vec::with_capacity(12 + encrypted.len());
        out.extend_from_slice(&nonce_bytes);
        out.extend_from_slice(&encrypted);
        Ok(BASE64.encode(out))
    }

    fn decrypt(&self, encoded: &str) -> Option<String> {
        if encoded.is_empty() {
            return Some(String::new());
        }
        let bytes = BASE64.decode(encoded).ok()?;
        if bytes.len() <= 12 {
            return None;
        }
        let (nonce_bytes, cipher_bytes) = bytes.split_at(12);
        let nonce = Nonce::from_slice(nonce_bytes);
        let cipher = Aes256Gcm::new_from_slice(&self.key).ok()?;
        let plain = cipher.decrypt(nonce, cipher_bytes).ok()?;
        String::from_utf8(plain).ok()
    }
}

impl LocalStore {
    pub fn default_db_path() -> PathBuf {
        #[cfg(target_os = "windows")]
        {
            std::env::var_os("APPDATA")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("."))
                .join("Brainwave Labs")
                .join("Brainwave")
                .join("brainwave.db")
        }
        #[cfg(not(target_os = "windows"))]
        {
            std::env::var_os("XDG_DATA_HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| {
                    std::env::var_os("HOME")
                        .map(PathBuf::from)
                        .unwrap_or_else(|| PathBuf::from("/tmp"))
                        .join(".local")
                        .join("share")
                })
                .join("brainwave")
                .join("brainwave.db")
        }
    }

    pub fn new(db_path: PathBuf) -> Result<Self, String> {
        if let Some(parent) = db_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| e.to_string())?;
        }
        let store = Self {
            cipher: TextCipher::new(&db_path),
            db_path,
        };
        store.init_schema()?;
        Ok(store)
    }

    fn open(&self) -> Result<Connection, String> {
        Connection::open(&self.db_path).map_err(|e| e.to_string())
    }

    fn init_schema(&self) -> Result<(), String> {
        let conn = self.open()?;
        conn.execute_batch(
            r#"
            PRAGMA journal_mode = WAL;
            CREATE TABLE IF NOT EXISTS practice_videos (
              id TEXT PRIMARY KEY,
              title TEXT NOT NULL,
              description TEXT NOT NULL DEFAULT '',
              youtube_url TEXT NOT NULL,
              exercise_type TEXT NOT NULL,
              date_added INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS practice_sessions (
              id TEXT PRIMARY KEY,
              created_at INTEGER NOT NULL,
              transcript_enc TEXT NOT NULL,
              descriptors_json TEXT NOT NULL,
              feedback_count INTEGER NOT NULL DEFAULT 0
            );

            CREATE INDEX IF NOT EXISTS idx_videos_exercise_type ON practice_videos(exercise_type);
            CREATE INDEX IF NOT EXISTS idx_sessions_created_at ON practice_sessions(created_at DESC);
            "#,
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn add_video(
        &self,
        title: &str,
        description: &str,
        youtube_url: &str,
        exercise_type: &str,
    ) -> Result<VideoEntry, String> {
        let now = Utc::now().timestamp();
        let entry = VideoEntry {
            id: new_id("vid"),
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            youtube_url: youtube_url.trim().to_string(),
            exercise_type: exercise_type.trim().to_ascii_lowercase(),
            date_added: ts_to_rfc3339(now),
        };
        if entry.title.is_empty() {
            return Err("video title must not be empty".into());
        }
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO practice_videos (id, title, description, youtube_url, exercise_type, date_added)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                entry.id,
                entry.title,
                entry.description,
                entry.youtube_url,
                entry.exercise_type,
                now
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(entry)
    }

    /// List videos newest first, optionally filtered by exercise type.
    pub fn list_videos(&self, exercise_type: Option<&str>) -> Result<Vec<VideoEntry>, String> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, youtube_url, exercise_type, date_added
                 FROM practice_videos ORDER BY date_added DESC",
            )
            .map_err(|e| e.to_string())?;
        let mut rows = stmt.query([]).map_err(|e| e.to_string())?;
        let filter = exercise_type.map(|t| t.trim().to_ascii_lowercase());

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let entry = VideoEntry {
                id: row.get(0).map_err(|e| e.to_string())?,
                title: row.get(1).map_err(|e| e.to_string())?,
                description: row.get(2).map_err(|e| e.to_string())?,
                youtube_url: row.get(3).map_err(|e| e.to_string())?,
                exercise_type: row.get(4).map_err(|e| e.to_string())?,
                date_added: ts_to_rfc3339(row.get::<_, i64>(5).map_err(|e| e.to_string())?),
            };
            if let Some(ref f) = filter {
                if entry.exercise_type != *f {
                    continue;
                }
            }
            out.push(entry);
        }
        Ok(out)
    }

    pub fn delete_video(&self, id: &str) -> Result<bool, String> {
        let conn = self.open()?;
        let changed = conn
            .execute("DELETE FROM practice_videos WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(changed > 0)
    }

    pub fn insert_session(&self, report: &AnalysisReport) -> Result<String, String> {
        let now = Utc::now().timestamp();
        let id = new_id("sess");
        let transcript_enc = self.cipher.encrypt(&report.transcript)?;
        let descriptors_json =
            serde_json::to_string(&report.descriptors).map_err(|e| e.to_string())?;
        let conn = self.open()?;
        conn.execute(
            "INSERT INTO practice_sessions (id, created_at, transcript_enc, descriptors_json, feedback_count)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                id,
                now,
                transcript_enc,
                descriptors_json,
                report.feedback.len() as i64
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(id)
    }

    /// List sessions newest first. Rows whose transcript fails to decrypt
    /// (key changed, corruption) are skipped rather than failing the list.
    pub fn list_sessions(&self, limit: usize) -> Result<Vec<SessionItem>, String> {
        let limit = limit.clamp(1, 500);
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(
                "SELECT id, created_at, transcript_enc, descriptors_json, feedback_count
                 FROM practice_sessions ORDER BY created_at DESC LIMIT ?1",
            )
            .map_err(|e| e.to_string())?;
        let mut rows = stmt.query(params![limit as i64]).map_err(|e| e.to_string())?;

        let mut out = Vec::new();
        while let Some(row) = rows.next().map_err(|e| e.to_string())? {
            let enc: String = row.get(2).map_err(|e| e.to_string())?;
            let Some(transcript) = self.cipher.decrypt(&enc) else {
                continue;
            };
            let descriptors_json: String = row.get(3).map_err(|e| e.to_string())?;
            let Ok(descriptors) = serde_json::from_str::<AudioDescriptors>(&descriptors_json)
            else {
                continue;
            };
            out.push(SessionItem {
                id: row.get(0).map_err(|e| e.to_string())?,
                created_at: ts_to_rfc3339(row.get::<_, i64>(1).map_err(|e| e.to_string())?),
                transcript,
                descriptors,
                feedback_count: row.get::<_, i64>(4).map_err(|e| e.to_string())? as usize,
            });
        }
        Ok(out)
    }

    /// Delete sessions older than the cutoff; `None` clears everything.
    pub fn clear_sessions(&self, older_than_days: Option<usize>) -> Result<usize, String> {
        let conn = self.open()?;
        let deleted = match older_than_days {
            Some(days) => {
                let cutoff = Utc::now() - Duration::days(days as i64);
                conn.execute(
                    "DELETE FROM practice_sessions WHERE created_at < ?1",
                    params![cutoff.timestamp()],
                )
            }
            None => conn.execute("DELETE FROM practice_sessions", []),
        }
        .map_err(|e| e.to_string())?;
        Ok(deleted)
    }

    pub fn prune_sessions(&self, retention_days: usize) -> Result<usize, String> {
        if retention_days == 0 {
            return Ok(0);
        }
        self.clear_sessions(Some(retention_days))
    }
}

fn ts_to_rfc3339(ts: i64) -> String {
    let dt: DateTime<Utc> = Utc.timestamp_opt(ts, 0).single().unwrap_or_else(Utc::now);
    dt.to_rfc3339()
}

fn new_id(prefix: &str) -> String {
    format!(
        "{prefix}-{}-{:08x}",
        Utc::now().timestamp_micros(),
        rand::random::<u32>()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use brainwave_core::{FeedbackItem, FeedbackKind, Severity};

    fn store() -> (tempfile::TempDir, LocalStore) {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = LocalStore::new(dir.path().join("test.db")).expect("open store");
        (dir, store)
    }

    fn report(transcript: &str) -> AnalysisReport {
        AnalysisReport {
            descriptors: AudioDescriptors {
                volume: 0.4,
                clarity: 0.9,
                pace: 0.6,
                pauses: 3,
                duration: 12.0,
                complexity: 0.5,
            },
            feedback: vec![FeedbackItem {
                id: "fb-test".into(),
                kind: FeedbackKind::General,
                severity: Severity::Success,
                message: "Keep up the regular practice".into(),
                suggestion: "Keep practicing.".into(),
                exercises: None,
                timestamp: None,
            }],
            transcript: transcript.into(),
        }
    }

    #[test]
    fn videos_round_trip_with_type_filter() {
        let (_dir, store) = store();
        store
            .add_video("Vowel drills", "Short vowels", "https://youtu.be/a", "pronunciation")
            .unwrap();
        store
            .add_video("News listening", "", "https://youtu.be/b", "Listening")
            .unwrap();

        let all = store.list_videos(None).unwrap();
        assert_eq!(all.len(), 2);

        let listening = store.list_videos(Some("listening")).unwrap();
        assert_eq!(listening.len(), 1);
        assert_eq!(listening[0].title, "News listening");
        // Exercise type is stored lowercased.
        assert_eq!(listening[0].exercise_type, "listening");
    }

    #[test]
    fn empty_video_title_is_rejected() {
        let (_dir, store) = store();
        let err = store.add_video("  ", "", "https://youtu.be/x", "grammar");
        assert!(err.is_err());
    }

    #[test]
    fn delete_video_reports_whether_a_row_existed() {
        let (_dir, store) = store();
        let entry = store
            .add_video("A", "", "https://youtu.be/a", "grammar")
            .unwrap();
        assert!(store.delete_video(&entry.id).unwrap());
        assert!(!store.delete_video(&entry.id).unwrap());
    }

    #[test]
    fn sessions_decrypt_on_the_same_store() {
        let (_dir, store) = store();
        store.insert_session(&report("I am practicing.")).unwrap();

        let items = store.list_sessions(10).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].transcript, "I am practicing.");
        assert_eq!(items[0].feedback_count, 1);
        assert_eq!(items[0].descriptors.pauses, 3);
    }

    #[test]
    fn transcripts_are_not_stored_in_plaintext() {
        let (_dir, store) = store();
        store.insert_session(&report("secret practice text")).unwrap();

        let conn = Connection::open(&store.db_path).unwrap();
        let enc: String = conn
            .query_row("SELECT transcript_enc FROM practice_sessions", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert!(!enc.contains("secret practice text"));
    }

    #[test]
    fn clear_sessions_without_cutoff_removes_everything() {
        let (_dir, store) = store();
        store.insert_session(&report("one")).unwrap();
        store.insert_session(&report("two")).unwrap();
        assert_eq!(store.clear_sessions(None).unwrap(), 2);
        assert!(store.list_sessions(10).unwrap().is_empty());
    }

    #[test]
    fn recent_sessions_survive_pruning() {
        let (_dir, store) = store();
        store.insert_session(&report("fresh")).unwrap();
        assert_eq!(store.prune_sessions(30).unwrap(), 0);
        assert_eq!(store.list_sessions(10).unwrap().len(), 1);
    }
}
