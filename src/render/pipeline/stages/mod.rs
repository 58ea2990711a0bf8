//! Default pipeline stages.
//!
//! The standard conversion pipeline consists of:
//!
//! 1. **FenceStage** - Replace fenced code and diagram blocks with placeholders
//! 2. **InlineCodeStage** - Replace code spans and math spans with placeholders
//! 3. **BlockStage** - Convert block structure and escape document text
//! 4. **InlineStage** - Convert emphasis, strikethrough, links and images
//! 5. **ExtensionStage** - Footnotes, highlight, super/subscript, paragraphs
//! 6. **RestoreStage** - Substitute code placeholders with their HTML
//! 7. **MathStage** - Substitute math placeholders, last of all

mod blocks;
mod extensions;
mod fence;
mod inline;
mod inline_code;
mod math;
mod restore;

pub use blocks::BlockStage;
pub use extensions::ExtensionStage;
pub use fence::FenceStage;
pub use inline::InlineStage;
pub use inline_code::InlineCodeStage;
pub use math::MathStage;
pub use restore::RestoreStage;
