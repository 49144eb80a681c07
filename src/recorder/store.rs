//! Ordered, shared list of captured steps.
//!
//! The capture worker appends while recording; the editing surface mutates
//! titles and annotations afterwards. Every operation takes the lock once, so
//! an append is never observed half-done by a concurrent reader.

use parking_lot::RwLock;
use std::sync::Arc;

use super::types::{Annotation, Placement, Step};
use crate::error::{Error, Result};

#[derive(Clone, Default)]
pub struct StepStore {
    steps: Arc<RwLock<Vec<Step>>>,
}

impl StepStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step. Its index must be greater than the last one stored.
    pub fn append(&self, step: Step) -> Result<()> {
        let mut steps = self.steps.write();
        if let Some(last) = steps.last() {
            if step.index <= last.index {
                return Err(Error::SequenceOutOfOrder {
                    last: last.index,
                    got: step.index,
                });
            }
        }
        steps.push(step);
        Ok(())
    }

    /// Replace the whole list, e.g. after loading a project.
    pub fn replace(&self, new_steps: Vec<Step>) -> Result<()> {
        if let Some(pair) = new_steps.windows(2).find(|w| w[1].index <= w[0].index) {
            return Err(Error::SequenceOutOfOrder {
                last: pair[0].index,
                got: pair[1].index,
            });
        }
        *self.steps.write() = new_steps;
        Ok(())
    }

    pub fn clear(&self) {
        self.steps.write().clear();
    }

    pub fn len(&self) -> usize {
        self.steps.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.read().is_empty()
    }

    pub fn get(&self, position: usize) -> Option<Step> {
        self.steps.read().get(position).cloned()
    }

    /// Copy of the current list, for export or display.
    pub fn snapshot(&self) -> Vec<Step> {
        self.steps.read().clone()
    }

    pub fn set_title(&self, position: usize, title: impl Into<String>) -> Result<()> {
        self.with_step(position, |step| {
            step.title = title.into();
            Ok(())
        })
    }

    pub fn add_annotation(
        &self,
        position: usize,
        placement: Placement,
        annotation: Annotation,
    ) -> Result<()> {
        self.with_step(position, |step| {
            step.annotations_mut(placement).push(annotation);
            Ok(())
        })
    }

    pub fn set_annotation_text(
        &self,
        position: usize,
        placement: Placement,
        index: usize,
        text: impl Into<String>,
    ) -> Result<()> {
        self.with_step(position, |step| {
            let annotation = step
                .annotations_mut(placement)
                .get_mut(index)
                .ok_or(Error::AnnotationNotFound {
                    step: position,
                    index,
                })?;
            annotation.text = text.into();
            Ok(())
        })
    }

    pub fn remove_annotation(
        &self,
        position: usize,
        placement: Placement,
        index: usize,
    ) -> Result<Annotation> {
        self.with_step(position, |step| {
            let list = step.annotations_mut(placement);
            if index >= list.len() {
                return Err(Error::AnnotationNotFound {
                    step: position,
                    index,
                });
            }
            Ok(list.remove(index))
        })
    }

    fn with_step<T>(&self, position: usize, f: impl FnOnce(&mut Step) -> Result<T>) -> Result<T> {
        let mut steps = self.steps.write();
        let step = steps.get_mut(position).ok_or(Error::StepNotFound(position))?;
        f(step)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::types::AnnotationKind;
    use std::path::PathBuf;
    use std::thread;

    fn step(index: u32) -> Step {
        Step::new(index, PathBuf::from(format!("step_{index:03}.png")), Step::default_title(index))
    }

    #[test]
    fn append_keeps_order() {
        let store = StepStore::new();
        store.append(step(0)).unwrap();
        store.append(step(2)).unwrap();
        assert_eq!(store.len(), 2);
        assert_eq!(store.get(1).unwrap().index, 2);
    }

    #[test]
    fn append_rejects_non_increasing_index() {
        let store = StepStore::new();
        store.append(step(3)).unwrap();
        assert!(matches!(
            store.append(step(3)),
            Err(Error::SequenceOutOfOrder { last: 3, got: 3 })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn replace_validates_before_touching_state() {
        let store = StepStore::new();
        store.append(step(0)).unwrap();
        assert!(store.replace(vec![step(5), step(1)]).is_err());
        assert_eq!(store.snapshot(), vec![step(0)]);
    }

    #[test]
    fn edits_titles_and_annotations() {
        let store = StepStore::new();
        store.append(step(0)).unwrap();
        store.set_title(0, "Open settings").unwrap();
        store
            .add_annotation(0, Placement::Before, Annotation::new(AnnotationKind::Note, ""))
            .unwrap();
        store
            .add_annotation(0, Placement::After, Annotation::new(AnnotationKind::Tip, "done"))
            .unwrap();
        store
            .set_annotation_text(0, Placement::Before, 0, "Admin only")
            .unwrap();

        let s = store.get(0).unwrap();
        assert_eq!(s.title, "Open settings");
        assert_eq!(s.annotations_before[0].text, "Admin only");
        assert_eq!(s.annotations_after[0].kind, AnnotationKind::Tip);

        let removed = store.remove_annotation(0, Placement::After, 0).unwrap();
        assert_eq!(removed.text, "done");
        assert!(store.get(0).unwrap().annotations_after.is_empty());
    }

    #[test]
    fn edits_report_missing_targets() {
        let store = StepStore::new();
        assert!(matches!(store.set_title(4, "x"), Err(Error::StepNotFound(4))));
        store.append(step(0)).unwrap();
        assert!(matches!(
            store.remove_annotation(0, Placement::Before, 0),
            Err(Error::AnnotationNotFound { step: 0, index: 0 })
        ));
    }

    #[test]
    fn concurrent_appends_and_reads_stay_consistent() {
        let store = StepStore::new();
        let writer = {
            let store = store.clone();
            thread::spawn(move || {
                for i in 0..500 {
                    store.append(step(i)).unwrap();
                }
            })
        };
        while !writer.is_finished() {
            let snap = store.snapshot();
            assert!(snap.windows(2).all(|w| w[0].index < w[1].index));
        }
        writer.join().unwrap();
        assert_eq!(store.len(), 500);
    }
}
