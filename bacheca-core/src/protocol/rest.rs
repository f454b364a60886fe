use serde::{Deserialize, Serialize};
/*
    dto per le chiamate REST verso la tabella dei messaggi (dialetto PostgREST):
    GET   /rest/v1/<table>?select=*&order=created_at.desc&limit=N
    POST  /rest/v1/<table>            body: [NewMessageRow]
    PATCH /rest/v1/<table>?id=eq.<id> body: NotifiedPatch
*/

/// Percorso REST di una tabella.
pub fn table_path(table: &str) -> String {
    format!("/rest/v1/{}", table)
}

// Insert
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewMessageRow {
    pub name: String,
    pub message: String,
    #[serde(default)]
    pub telegram_sent: bool,
}

/// PostgREST accetta sia un singolo oggetto sia un array di righe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum InsertBody {
    One(NewMessageRow),
    Many(Vec<NewMessageRow>),
}

impl InsertBody {
    pub fn into_rows(self) -> Vec<NewMessageRow> {
        match self {
            InsertBody::One(row) => vec![row],
            InsertBody::Many(rows) => rows,
        }
    }
}

// Update
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotifiedPatch {
    pub telegram_sent: bool,
}

/// Direzione di ordinamento del parametro `order`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Parametro `order=<colonna>.<asc|desc>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Order {
    pub column: String,
    pub direction: Direction,
}

impl Order {
    pub fn newest_first() -> Self {
        Self { column: "created_at".to_string(), direction: Direction::Desc }
    }

    /// Parsing di "created_at.desc"; senza suffisso la direzione è ascendente.
    pub fn parse(raw: &str) -> Option<Self> {
        let (column, direction) = match raw.rsplit_once('.') {
            Some((column, "desc")) => (column, Direction::Desc),
            Some((column, "asc")) => (column, Direction::Asc),
            Some(_) => return None,
            None => (raw, Direction::Asc),
        };
        if column.is_empty() {
            return None;
        }
        Some(Self { column: column.to_string(), direction })
    }

    pub fn to_param(&self) -> String {
        let dir = match self.direction {
            Direction::Asc => "asc",
            Direction::Desc => "desc",
        };
        format!("{}.{}", self.column, dir)
    }
}

/// Query di lettura dei messaggi recenti.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub order: Order,
    pub limit: usize,
}

impl ListQuery {
    pub fn recent(limit: usize) -> Self {
        Self { order: Order::newest_first(), limit }
    }

    /// Coppie chiave/valore della query string.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        vec![
            ("select", "*".to_string()),
            ("order", self.order.to_param()),
            ("limit", self.limit.to_string()),
        ]
    }
}

/// Filtro di uguaglianza `eq.<valore>` usato per aggiornare una riga per id.
pub fn eq_filter(value: &str) -> String {
    format!("eq.{}", value)
}

/// Estrae il valore da un filtro `eq.<valore>`.
pub fn parse_eq_filter(raw: &str) -> Option<&str> {
    raw.strip_prefix("eq.").filter(|v| !v.is_empty())
}
