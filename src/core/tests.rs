#[cfg(test)]
mod tests {
    use crate::core::types::{Ack, TaskId, TaskStatus, UploadForm, VideoInfo};

    #[test]
    fn test_task_status_transition() {
        use TaskStatus::*;

        // valid
        assert!(TaskStatus::is_valid_transition(Pending, Running));
        assert!(TaskStatus::is_valid_transition(Running, Paused));
        assert!(TaskStatus::is_valid_transition(Paused, Running));
        assert!(TaskStatus::is_valid_transition(Running, Canceled));
        assert!(TaskStatus::is_valid_transition(Paused, Canceled));
        assert!(TaskStatus::is_valid_transition(Running, Completed));
        assert!(TaskStatus::is_valid_transition(Failed, Pending));
        assert!(TaskStatus::is_valid_transition(Failed, Running));
        assert!(TaskStatus::is_valid_transition(Running, Pending));

        // invalid
        assert!(!TaskStatus::is_valid_transition(Completed, Running));
        assert!(!TaskStatus::is_valid_transition(Canceled, Pending));
        assert!(!TaskStatus::is_valid_transition(Paused, Completed));
        assert!(!TaskStatus::is_valid_transition(Pending, Completed));
    }

    #[test]
    fn test_terminal_states_have_no_exit() {
        use TaskStatus::*;

        let all = [Pending, Running, Paused, Canceled, Failed, Completed];
        for from in [Canceled, Completed] {
            assert!(from.is_terminal());
            for to in all {
                assert!(!TaskStatus::is_valid_transition(from, to));
            }
        }
        assert!(!Running.is_terminal());
    }

    #[test]
    fn test_ack_flag() {
        assert_eq!(Ack::from(true).as_flag(), 1);
        assert_eq!(Ack::from(false).as_flag(), 0);
        assert!(!Ack::Declined.is_accepted());
    }

    #[test]
    fn test_task_id_display() {
        let id = TaskId::from("BV1xx411c7mD");
        assert_eq!(id.to_string(), "BV1xx411c7mD");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"BV1xx411c7mD\"");
    }

    #[test]
    fn test_video_complete_flag_stays_local() {
        let mut video = VideoInfo::new("v1", "clip");
        video.complete = true;
        let json = serde_json::to_value(&video).unwrap();
        assert!(json.get("complete").is_none());

        let parsed: VideoInfo = serde_json::from_str(r#"{"id": "v1", "complete": true}"#).unwrap();
        assert!(parsed.complete);
    }

    #[test]
    fn test_upload_form_validation() {
        let mut form = UploadForm {
            title: "My trip".into(),
            copyright: 1,
            videos: vec![VideoInfo::new("v1", "part 1")],
            ..Default::default()
        };
        assert!(form.validate().is_ok());

        form.copyright = 3;
        assert!(form.validate().is_err());

        form.copyright = 2;
        form.videos.clear();
        assert!(form.validate().is_err());

        form.videos.push(VideoInfo::new("v1", "part 1"));
        form.title = "   ".into();
        assert!(form.validate().is_err());
    }
}
