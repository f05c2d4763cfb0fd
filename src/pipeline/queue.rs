//! Work queue for the character batch.
//!
//! Uses a std::sync::mpsc channel: the driver enqueues one job per
//! character, the worker pool drains it until the sender is dropped.

use std::path::PathBuf;
use std::sync::mpsc::{Receiver, Sender, channel};

/// One character to process: the two card face images plus caller-supplied
/// identity and grouping.
#[derive(Debug, Clone)]
pub struct CharacterJob {
    pub id: String,
    pub season: String,
    pub front_path: PathBuf,
    pub back_path: PathBuf,
}

/// Creates the job queue shared between the driver and the worker pool.
pub fn create_work_queue() -> (Sender<CharacterJob>, Receiver<CharacterJob>) {
    channel()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str) -> CharacterJob {
        CharacterJob {
            id: id.to_string(),
            season: "1".to_string(),
            front_path: PathBuf::from(format!("{id}_front.png")),
            back_path: PathBuf::from(format!("{id}_back.png")),
        }
    }

    #[test]
    fn test_queue_preserves_order() {
        let (sender, receiver) = create_work_queue();
        for i in 1..=5 {
            sender.send(job(&format!("ch{i:02}"))).expect("send");
        }
        for i in 1..=5 {
            assert_eq!(receiver.recv().expect("recv").id, format!("ch{i:02}"));
        }
    }

    #[test]
    fn test_channel_closes_when_sender_dropped() {
        let (sender, receiver) = create_work_queue();
        sender.send(job("ch01")).unwrap();
        drop(sender);

        assert!(receiver.recv().is_ok());
        assert!(receiver.recv().is_err());
    }
}
