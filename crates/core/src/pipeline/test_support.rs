use crate::detection::domain::face_analysis::FaceAnalysis;
use crate::detection::domain::face_analyzer::FaceAnalyzer;
use crate::shared::frame::Frame;

struct FnAnalyzer<F>(F);

impl<F> FaceAnalyzer for FnAnalyzer<F>
where
    F: FnMut(&Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>> + Send,
{
    fn analyze(&mut self, frame: &Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>> {
        (self.0)(frame)
    }
}

/// Wraps a closure as a [`FaceAnalyzer`].
pub(crate) fn analyzer<F>(f: F) -> Box<dyn FaceAnalyzer>
where
    F: FnMut(&Frame) -> Result<Vec<FaceAnalysis>, Box<dyn std::error::Error>> + Send + 'static,
{
    Box::new(FnAnalyzer(f))
}
