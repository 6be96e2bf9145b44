pub mod io;
pub mod markup;
pub mod model;
pub mod parts;
pub mod pointers;
pub mod sequences;
pub mod snapshot;

// Re-export key types for easier usage
pub use io::{DirectoryFetcher, FallbackFetcher, FetchError, MemoryCache, PartFetcher};
pub use markup::{Markup, PotentialAttributeValue, Rule};
pub use model::{
    ContentId, Defaults, DocumentModel, DocumentModelBuilder, DocumentModelLink, EdlId, EdlModel,
    IncomingPointer, LinkId, ObjectId, SequenceId, Zettel, ZettelId,
};
pub use parts::{Edl, Link, LinkEnd, Part, PartContent};
pub use pointers::{
    EdlPointer, FormatError, Image, InlinePointer, Leaf, LinkPointer, Nibble, Pointer, Span,
};
pub use sequences::{Sequence, SequenceMember};
