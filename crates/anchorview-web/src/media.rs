//! Camera stream and video surface cleanup

use wasm_bindgen::JsCast;

/// Stop every track of the stream attached to `video` and detach it
pub fn stop_video_tracks(video: &web_sys::HtmlVideoElement) -> Result<(), String> {
    let Some(stream) = video.src_object() else {
        return Ok(());
    };
    let mut stopped = 0;
    for track in stream.get_tracks().iter() {
        if let Ok(track) = track.dyn_into::<web_sys::MediaStreamTrack>() {
            track.stop();
            stopped += 1;
        }
    }
    video.set_src_object(None);
    tracing::debug!(stopped, "camera tracks stopped");
    Ok(())
}

fn page_videos() -> Result<Vec<web_sys::HtmlVideoElement>, String> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| "no document".to_string())?;
    let collection = document.get_elements_by_tag_name("video");
    Ok((0..collection.length())
        .filter_map(|i| collection.item(i))
        .filter_map(|el| el.dyn_into::<web_sys::HtmlVideoElement>().ok())
        .collect())
}

/// Fallback when the tracker never exposed its video element
pub fn stop_page_video_tracks() -> Result<(), String> {
    for video in page_videos()? {
        stop_video_tracks(&video)?;
    }
    Ok(())
}

pub fn remove_page_videos() -> Result<(), String> {
    for video in page_videos()? {
        video.remove();
    }
    Ok(())
}
