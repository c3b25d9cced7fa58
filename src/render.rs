use crate::events::{Phase, SliderSnapshot};

/// What one slide layer should draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideFrame<'a> {
    pub index: usize,
    pub title: &'a str,
    pub subtitle: Option<&'a str>,
    /// Background image, `None` while the slide keeps its placeholder.
    pub image: Option<&'a str>,
    pub active: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Rendered<'a> {
    /// Spinner section while the list or first image is pending.
    Loading,
    /// Empty or failed fetch: the section is omitted entirely.
    Nothing,
    Slides(Vec<SlideFrame<'a>>),
}

/// Applies the paint policy to a snapshot.
///
/// Every slide keeps its text scaffold so the layout never shifts; only
/// the background image waits for readiness. The active slide always
/// attempts its image.
pub fn render(snapshot: &SliderSnapshot) -> Rendered<'_> {
    if snapshot.phase == Phase::Loading {
        return Rendered::Loading;
    }
    if snapshot.slides.is_empty() {
        return Rendered::Nothing;
    }
    let frames = snapshot
        .slides
        .iter()
        .enumerate()
        .map(|(index, slide)| {
            let active = index == snapshot.current;
            let paint = active || snapshot.ready.contains(&index);
            SlideFrame {
                index,
                title: &slide.title,
                subtitle: slide.subtitle.as_deref().filter(|s| !s.is_empty()),
                image: paint.then_some(slide.image.as_str()),
                active,
            }
        })
        .collect();
    Rendered::Slides(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{AutoplayState, Slide};
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn snapshot(n: usize, current: usize, ready: &[usize]) -> SliderSnapshot {
        let slides: Vec<Slide> = (0..n)
            .map(|i| Slide {
                id: format!("s{i}"),
                title: format!("Title {i}"),
                subtitle: (i == 0).then(|| "Opening reel".to_string()),
                image: format!("https://cdn.example/{i}.jpg"),
                order: i as i64,
                is_active: true,
                created_at: None,
                updated_at: None,
            })
            .collect();
        SliderSnapshot {
            phase: Phase::Ready,
            slides: Arc::from(slides),
            current,
            ready: ready.iter().copied().collect::<BTreeSet<_>>(),
            visible: true,
            autoplay: AutoplayState::Stopped,
            prefetch_passes: 0,
            prefetch_batches: 0,
        }
    }

    #[test]
    fn loading_and_empty_states() {
        assert_eq!(render(&SliderSnapshot::loading()), Rendered::Loading);
        assert_eq!(render(&snapshot(0, 0, &[0])), Rendered::Nothing);
    }

    #[test]
    fn only_ready_or_active_slides_paint_images() {
        let snap = snapshot(3, 1, &[0]);
        let Rendered::Slides(frames) = render(&snap) else {
            panic!("expected slides");
        };
        let painted: Vec<bool> = frames.iter().map(|f| f.image.is_some()).collect();
        assert_eq!(painted, vec![true, true, false]);
        assert!(frames[1].active);
        // Scaffold is kept for unpainted slides.
        assert_eq!(frames[2].title, "Title 2");
        assert_eq!(frames[0].subtitle, Some("Opening reel"));
    }
}
