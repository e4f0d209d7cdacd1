use rig_core::{read_pose_log, CameraConvention};
use std::io::Write;

fn identity_record(timestamp: u64) -> String {
    let identity = "1,0,0,0,0,1,0,0,0,0,1,0,0,0,0,1";
    let trailing = ["0"; 16].join(",");
    format!("{},0,{},{},{}", timestamp, identity, identity, trailing)
}

#[test]
fn reads_pose_log_from_disk() {
    let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
    writeln!(file, "Timestamp,Reserved,FrameToOrigin,CameraToFrame").unwrap();
    writeln!(file, "{}", identity_record(42)).unwrap();
    writeln!(file, "{}", identity_record(43)).unwrap();
    file.flush().unwrap();

    let poses = read_pose_log(file.path(), CameraConvention::Native).unwrap();
    assert_eq!(poses.len(), 2);
    assert!(poses.contains_key(&42));
    assert!(poses.contains_key(&43));
}

#[test]
fn missing_pose_log_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("vlc_ll.csv");
    assert!(read_pose_log(&missing, CameraConvention::Native).is_err());
}
