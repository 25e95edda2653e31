use serde::{Deserialize, Serialize};

/// Backend note ids are sqlite row ids.
pub type NoteId = i64;
pub type FolderId = i64;

/// Which library a paper/note lives in. The backend keeps the knowledge base and the
/// "inspiration" board as two scopes over the same tables.
#[derive(
    Serialize, Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq, strum::AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Scope {
    #[default]
    Kb,
    Inspiration,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct NoteRecord {
    pub id: NoteId,
    #[serde(default)]
    pub paper_id: String,

    /// `markdown`, `file` or `link`. Only markdown notes are editable.
    #[serde(rename = "type", default = "default_note_kind")]
    pub kind: String,

    pub title: String,

    /// Absent in list responses and for file/link notes.
    #[serde(default)]
    pub content: Option<String>,

    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

fn default_note_kind() -> String {
    "markdown".to_string()
}

/// Partial update: omitted fields are left untouched by the backend.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct NoteUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

impl NoteUpdate {
    pub fn is_noop(&self) -> bool {
        self.title.is_none() && self.content.is_none()
    }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CreateNoteRequest {
    pub title: String,
    pub content: String,
    pub scope: Scope,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct NoteListResponse {
    pub paper_id: String,
    #[serde(default)]
    pub notes: Vec<NoteRecord>,
}

/// One block of the rich-content tree.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Block {
    Paragraph {
        #[serde(default)]
        children: Vec<Inline>,
    },
    Heading {
        level: u8,
        #[serde(default)]
        children: Vec<Inline>,
    },
    List {
        #[serde(default)]
        ordered: bool,
        /// Each item is itself a block sequence (nested lists live here).
        #[serde(default)]
        items: Vec<Vec<Block>>,
    },
    Image {
        src: String,
        #[serde(default)]
        alt: String,
    },
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Inline {
    Text {
        text: String,
    },
    Link {
        href: String,
        #[serde(default)]
        children: Vec<Inline>,
    },
}

impl Block {
    pub fn paragraph(text: impl Into<String>) -> Self {
        Block::Paragraph {
            children: vec![Inline::Text { text: text.into() }],
        }
    }

    pub fn empty_paragraph() -> Self {
        Block::Paragraph { children: vec![] }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct KbPaper {
    pub paper_id: String,
    #[serde(default)]
    pub folder_id: Option<FolderId>,
    #[serde(default)]
    pub note_count: u32,
    /// Opaque paper metadata (title, authors, ...); rendering concern only.
    #[serde(default)]
    pub paper_data: serde_json::Value,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FolderNode {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
    #[serde(default)]
    pub children: Vec<FolderNode>,
    #[serde(default)]
    pub papers: Vec<KbPaper>,
}

/// Flat folder row as returned by folder mutations (no children).
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FolderRecord {
    pub id: FolderId,
    pub name: String,
    #[serde(default)]
    pub parent_id: Option<FolderId>,
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct KbTree {
    #[serde(default)]
    pub folders: Vec<FolderNode>,
    /// Papers not filed under any folder.
    #[serde(default)]
    pub papers: Vec<KbPaper>,
}

impl KbTree {
    pub fn folder(&self, id: FolderId) -> Option<&FolderNode> {
        fn find(list: &[FolderNode], id: FolderId) -> Option<&FolderNode> {
            list.iter()
                .find_map(|f| if f.id == id { Some(f) } else { find(&f.children, id) })
        }
        find(&self.folders, id)
    }

    /// Re-file a folder according to a move response.
    ///
    /// The backend rejects cyclic or foreign targets by returning the folder unchanged, so
    /// the parent named by the response wins over whatever the client asked for. A parent
    /// that is not in the local tree files the folder at the root, as the backend's own
    /// tree builder does.
    pub fn apply_folder_move(&mut self, moved: &FolderRecord) -> bool {
        let Some(mut node) = detach_folder(&mut self.folders, moved.id) else {
            return false;
        };

        node.name = moved.name.clone();
        node.parent_id = moved.parent_id;

        let parent = moved
            .parent_id
            .and_then(|pid| find_folder_mut(&mut self.folders, pid));
        match parent {
            Some(p) => p.children.push(node),
            None => self.folders.push(node),
        }
        true
    }
}

fn detach_folder(list: &mut Vec<FolderNode>, id: FolderId) -> Option<FolderNode> {
    if let Some(pos) = list.iter().position(|f| f.id == id) {
        return Some(list.remove(pos));
    }
    list.iter_mut()
        .find_map(|f| detach_folder(&mut f.children, id))
}

fn find_folder_mut(list: &mut [FolderNode], id: FolderId) -> Option<&mut FolderNode> {
    list.iter_mut().find_map(|f| {
        if f.id == id {
            Some(f)
        } else {
            find_folder_mut(&mut f.children, id)
        }
    })
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct SaveCompareResultRequest {
    pub title: String,
    pub markdown: String,
    pub paper_ids: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder_id: Option<FolderId>,
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct CompareResultRecord {
    pub id: i64,
    pub title: String,
    #[serde(flatten)]
    pub extra: serde_json::Value,
}
