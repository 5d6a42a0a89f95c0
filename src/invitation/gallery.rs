//! Gallery lightbox: which photo, if any, is shown full-screen.

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lightbox {
    photos: usize,
    selected: Option<usize>,
}

impl Lightbox {
    pub fn new(photos: usize) -> Self {
        Self {
            photos,
            selected: None,
        }
    }

    pub fn photos(&self) -> usize {
        self.photos
    }

    pub fn selected(&self) -> Option<usize> {
        self.selected
    }

    /// Show photo `index`. Out-of-range indices are ignored.
    pub fn open(&mut self, index: usize) -> bool {
        if index >= self.photos {
            return false;
        }
        self.selected = Some(index);
        true
    }

    pub fn close(&mut self) {
        self.selected = None;
    }

    /// Previous photo, wrapping to the last. From closed it opens the last photo.
    pub fn prev(&mut self) -> Option<usize> {
        if self.photos == 0 {
            return None;
        }
        self.selected = Some(match self.selected {
            None | Some(0) => self.photos - 1,
            Some(i) => i - 1,
        });
        self.selected
    }

    /// Next photo, wrapping to the first. From closed it opens the first photo.
    pub fn next(&mut self) -> Option<usize> {
        if self.photos == 0 {
            return None;
        }
        self.selected = Some(match self.selected {
            Some(i) if i + 1 < self.photos => i + 1,
            _ => 0,
        });
        self.selected
    }
}
