use approx::assert_relative_eq;
use nalgebra::Vector3;

use track_interp::{
    Homography, InterpStatus, InterpolatorConfig, OutputPacket, Rect, StepError, StepInputs,
    StepInputsBuilder, Timestamp, Track, TrackState, TrackStateInterpolator,
};

/// Microseconds between consecutive frames (0.1 s).
const FRAME_US: f64 = 100_000.0;

fn ts(frame: u32) -> Timestamp {
    Timestamp::new(f64::from(frame) * FRAME_US, frame)
}

/// A detected state whose 10x10 box is centred on `(cx, 0)`.
fn state(frame: u32, cx: f64) -> TrackState {
    TrackState::new(
        ts(frame),
        Vector3::new(cx, 0.0, 0.0),
        Vector3::zeros(),
        Rect::new(cx - 5.0, -5.0, 10.0, 10.0),
    )
    .with_detection()
}

fn observed(id: u64, frames: &[(u32, f64)]) -> Track {
    Track::from_history(id, frames.iter().map(|&(f, x)| state(f, x)).collect())
}

fn tick<'a>(tracks: &'a [Track], frame: u32, homography: Option<Homography>) -> StepInputs<'a> {
    let builder = StepInputsBuilder::new()
        .tracks(tracks)
        .ref_to_world(Homography::identity())
        .timestamp(ts(frame))
        .gsd(0.3);
    let builder = match homography {
        Some(h) => builder.img_to_ref(h),
        None => builder.img_to_ref_absent(),
    };
    builder.build()
}

fn frames(out: &[OutputPacket]) -> Vec<u32> {
    out.iter().map(|p| p.timestamp.frame_number).collect()
}

fn interpolator() -> TrackStateInterpolator {
    TrackStateInterpolator::new(InterpolatorConfig::default()).unwrap()
}

#[test]
fn test_complete_stream_passes_through_unchanged() {
    let mut interp = interpolator();
    let mut out = Vec::new();
    let mut sent = Vec::new();

    let mut history = Vec::new();
    for frame in 0..5 {
        history.push((frame, f64::from(frame) * 3.0));
        let tracks = vec![observed(1, &history), observed(2, &[(0, 50.0), (frame, 50.0)])];
        interp
            .step(&tick(&tracks, frame, Some(Homography::identity())), &mut out)
            .unwrap();
        sent.push(tracks);
    }
    interp.flush(&mut out);

    assert_eq!(frames(&out), vec![0, 1, 2, 3, 4]);
    for (packet, tracks) in out.iter().zip(&sent) {
        assert_eq!(&packet.tracks, tracks);
        assert_eq!(packet.homography, Some(Homography::identity()));
        assert_eq!(packet.ref_to_world, Homography::identity());
        assert_eq!(packet.gsd, 0.3);
    }
}

#[test]
fn test_homography_gap_lands_halfway_in_world() {
    let mut interp = interpolator();
    let mut out = Vec::new();
    let tracks: Vec<Track> = Vec::new();

    interp
        .step(&tick(&tracks, 0, Some(Homography::identity())), &mut out)
        .unwrap();
    for frame in 1..10 {
        interp.step(&tick(&tracks, frame, None), &mut out).unwrap();
    }
    interp
        .step(&tick(&tracks, 10, Some(Homography::scaling(2.0))), &mut out)
        .unwrap();
    assert_eq!(interp.homography_status(), InterpStatus::Anchor0);
    interp.flush(&mut out);

    assert_eq!(frames(&out), (0..=10).collect::<Vec<_>>());
    for packet in &out[1..10] {
        let h = packet.homography.expect("gap frame homography synthesized");
        let scale = 1.0 + f64::from(packet.timestamp.frame_number) / 10.0;
        for (x, y) in [(0.0, 0.0), (1000.0, 0.0), (1000.0, 1000.0), (0.0, 1000.0)] {
            let (wx, wy) = h.then(&packet.ref_to_world).project_point(x, y).unwrap();
            assert_relative_eq!(wx, x * scale, epsilon = 1e-6);
            assert_relative_eq!(wy, y * scale, epsilon = 1e-6);
        }
    }
    assert_eq!(out[10].homography, Some(Homography::scaling(2.0)));
}

#[test]
fn test_track_gap_is_filled_in_world_space() {
    let mut interp = interpolator();
    let mut out = Vec::new();

    let before = vec![observed(1, &[(0, 0.0)])];
    for frame in 0..10 {
        assert_eq!(
            interp.step(&tick(&before, frame, Some(Homography::identity())), &mut out),
            Ok(0)
        );
    }
    let after = vec![observed(1, &[(0, 0.0), (10, 100.0)])];
    let emitted = interp
        .step(&tick(&after, 10, Some(Homography::identity())), &mut out)
        .unwrap();
    assert_eq!(emitted, 10);
    assert_eq!(frames(&out), (0..10).collect::<Vec<_>>());

    let at = |frame: usize| out[frame].tracks[0].last_state().unwrap().clone();
    let s4 = at(4);
    let s5 = at(5);
    assert_eq!(s5.frame_number(), 5);
    assert_relative_eq!(s5.location.x, 50.0, epsilon = 1e-9);
    assert_relative_eq!(s5.location.y, 0.0, epsilon = 1e-9);
    assert_eq!(s5.location.z, 0.0);

    let dt = (s5.timestamp.time - s4.timestamp.time) * 1e-6;
    let expected = (s5.location - s4.location) / dt;
    assert_relative_eq!(s5.velocity.x, expected.x, epsilon = 1e-9);
    assert_relative_eq!(s5.velocity.x, 100.0, epsilon = 1e-9);

    let object = s5.image_object.expect("synthesized state carries an image object");
    assert_relative_eq!(object.image_location.0, 50.0, epsilon = 1e-9);
    assert_relative_eq!(object.area, 100.0, epsilon = 1e-6);

    // Caller-owned tracks never see the synthesized states.
    assert_eq!(before, vec![observed(1, &[(0, 0.0)])]);
    assert_eq!(after[0].history().len(), 2);
}

#[test]
fn test_absent_frames_each_get_one_state() {
    let mut interp = interpolator();
    let mut out = Vec::new();
    let h = Some(Homography::identity());

    let mut seen = Vec::new();
    for frame in 0..3 {
        seen.push((frame, f64::from(frame)));
        interp.step(&tick(&[observed(4, &seen)], frame, h), &mut out).unwrap();
    }
    // Missing at frames 3, 4 and 5.
    for frame in 3..6 {
        interp.step(&tick(&[observed(4, &seen)], frame, h), &mut out).unwrap();
    }
    seen.push((6, 6.0));
    interp.step(&tick(&[observed(4, &seen)], 6, h), &mut out).unwrap();

    let cached: Vec<u32> = interp
        .history_cache()
        .load_history_up_to_frame(4, 6)
        .iter()
        .map(TrackState::frame_number)
        .collect();
    assert_eq!(cached, (0..=6).collect::<Vec<_>>());

    interp.flush(&mut out);
    assert_eq!(frames(&out), (0..=6).collect::<Vec<_>>());
    for packet in &out[3..6] {
        let frame = packet.timestamp.frame_number;
        let history: Vec<u32> = packet.tracks[0]
            .history()
            .iter()
            .map(TrackState::frame_number)
            .collect();
        assert_eq!(history, (0..=frame).collect::<Vec<_>>());
        assert_relative_eq!(
            packet.tracks[0].last_state().unwrap().location.x,
            f64::from(frame),
            epsilon = 1e-9
        );
    }
}

#[test]
fn test_stalled_gap_times_out() {
    let config = InterpolatorConfig {
        gap_buffer_max_length: 5,
        ..Default::default()
    };
    let mut interp = TrackStateInterpolator::new(config).unwrap();
    let mut out = Vec::new();
    let tracks: Vec<Track> = Vec::new();

    interp
        .step(&tick(&tracks, 0, Some(Homography::identity())), &mut out)
        .unwrap();
    for frame in 1..6 {
        assert_eq!(interp.step(&tick(&tracks, frame, None), &mut out), Ok(0));
    }
    assert_eq!(interp.step(&tick(&tracks, 6, None), &mut out), Ok(7));

    assert_eq!(frames(&out), (0..=6).collect::<Vec<_>>());
    assert!(out[1..].iter().all(|p| p.homography.is_none()));
    assert_eq!(interp.pending_len(), 0);
    assert_eq!(interp.homography_status(), InterpStatus::Nil);
    assert_eq!(interp.track_status(), InterpStatus::Nil);
}

#[test]
fn test_reset_matches_fresh_instance() {
    let mut reused = interpolator();
    let mut scratch = Vec::new();
    let old = vec![observed(1, &[(0, 0.0)])];
    for frame in 0..4 {
        reused
            .step(&tick(&old, frame, Some(Homography::identity())), &mut scratch)
            .unwrap();
    }
    assert!(reused.pending_len() > 0);
    reused.reset();

    let mut fresh = interpolator();
    let first = vec![observed(9, &[(0, 20.0)])];
    let second = vec![observed(9, &[(0, 20.0), (1, 25.0)])];

    let mut out_reused = Vec::new();
    let mut out_fresh = Vec::new();
    for (tracks, frame) in [(&first, 0), (&second, 1)] {
        let inputs = tick(tracks, frame, Some(Homography::identity()));
        assert_eq!(
            reused.step(&inputs, &mut out_reused),
            fresh.step(&inputs, &mut out_fresh)
        );
        assert_eq!(reused.pending_len(), fresh.pending_len());
        assert!(!reused.history_cache().contains_track(1));
    }
    reused.flush(&mut out_reused);
    fresh.flush(&mut out_fresh);
    assert_eq!(out_reused, out_fresh);
}

#[test]
fn test_missing_input_flushes_then_recovers() {
    let mut interp = interpolator();
    let mut out = Vec::new();
    let tracks = vec![observed(1, &[(0, 0.0)])];
    interp
        .step(&tick(&tracks, 0, Some(Homography::identity())), &mut out)
        .unwrap();
    interp.step(&tick(&tracks, 1, None), &mut out).unwrap();
    assert_eq!(interp.pending_len(), 2);

    let partial = StepInputsBuilder::new().tracks(&tracks).gsd(0.3).build();
    assert_eq!(
        interp.step(&partial, &mut out),
        Err(StepError::InputIncomplete {
            missing: vec!["img_to_ref", "ref_to_world", "timestamps"]
        })
    );
    assert_eq!(frames(&out), vec![0, 1]);
    assert_eq!(interp.pending_len(), 0);

    let next = vec![observed(1, &[(0, 0.0), (2, 2.0)])];
    assert_eq!(
        interp.step(&tick(&next, 2, Some(Homography::identity())), &mut out),
        Ok(0)
    );
    assert_eq!(interp.track_status(), InterpStatus::Anchor0);
}

#[test]
fn test_disabled_copies_live_slot() {
    let config = InterpolatorConfig {
        enabled: false,
        live_index: 5,
        ..Default::default()
    };
    let mut interp = TrackStateInterpolator::new(config).unwrap();
    let mut out = Vec::new();
    let tracks = vec![observed(3, &[(1, 1.0)])];

    let inputs = StepInputsBuilder::new()
        .tracks(&tracks)
        .img_to_ref_absent()
        .ref_to_world(Homography::translation(1.0, 2.0))
        .timestamps(vec![ts(0), ts(1)])
        .gsd(0.7)
        .build();
    assert_eq!(interp.step(&inputs, &mut out), Ok(1));
    assert_eq!(interp.pending_len(), 0);

    assert_eq!(out[0].timestamp, ts(1));
    assert_eq!(out[0].tracks, tracks);
    assert_eq!(out[0].homography, None);
    assert_eq!(out[0].ref_to_world, Homography::translation(1.0, 2.0));
    assert_eq!(out[0].gsd, 0.7);
}

#[test]
fn test_upsampling_fills_requested_timestamps() {
    let mut interp = interpolator();
    let mut out = Vec::new();

    let mut seen = Vec::new();
    let mut emitted = Vec::new();
    for live in [0u32, 2, 4] {
        seen.push((live, 10.0 * f64::from(live)));
        let tracks = vec![observed(5, &seen)];
        let inputs = StepInputsBuilder::new()
            .tracks(&tracks)
            .img_to_ref(Homography::identity())
            .ref_to_world(Homography::identity())
            .timestamps(vec![ts(live), ts(live + 1)])
            .gsd(0.3)
            .build();
        emitted.push(interp.step(&inputs, &mut out).unwrap());
    }
    assert_eq!(emitted, vec![0, 2, 2]);
    interp.flush(&mut out);

    assert_eq!(frames(&out), (0..6).collect::<Vec<_>>());
    for upsampled in [1usize, 3] {
        let packet = &out[upsampled];
        let h = packet.homography.expect("upsampled homography");
        let (x, y) = h.project_point(250.0, 750.0).unwrap();
        assert_relative_eq!(x, 250.0, epsilon = 1e-6);
        assert_relative_eq!(y, 750.0, epsilon = 1e-6);

        assert_eq!(packet.tracks.len(), 1);
        let last = packet.tracks[0].last_state().unwrap();
        assert_eq!(last.frame_number(), upsampled as u32);
        assert_relative_eq!(last.location.x, 10.0 * upsampled as f64, epsilon = 1e-9);
        assert_relative_eq!(last.velocity.x, 100.0, epsilon = 1e-9);
    }
    // Nothing closed the last upsampled slot.
    assert!(out[5].tracks.is_empty());
    assert!(out[5].homography.is_none());
}

#[test]
fn test_config_loads_from_toml() {
    let config = InterpolatorConfig::from_toml_str(
        "enabled = true\nlive_index = 1\ntimestamp_to_seconds = 0.001\ngap_buffer_max_length = 12\n",
    )
    .unwrap();
    assert_eq!(config.live_index, 1);
    assert_eq!(config.gap_buffer_max_length, 12);
    assert!(TrackStateInterpolator::new(config).is_ok());

    assert!(InterpolatorConfig::from_toml_str("gap_buffer_max_length = 0\n").is_err());
}
