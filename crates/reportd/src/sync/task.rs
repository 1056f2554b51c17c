/// One remote dataset to fetch and persist locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncTask {
    pub id: &'static str,
    pub file_name: &'static str,
    pub endpoint: &'static str,
    pub query: Vec<(&'static str, String)>,
}

/// The four datasets the ingest script expects: the customer extract and
/// the income endpoint by competence (B), payment (P) and issue (I) date.
pub fn default_tasks(start_date: &str, end_date: &str) -> Vec<SyncTask> {
    let income = |id, file_name, selection: &str| SyncTask {
        id,
        file_name,
        endpoint: "/income",
        query: vec![
            ("startDate", start_date.to_string()),
            ("endDate", end_date.to_string()),
            ("selectionType", selection.to_string()),
        ],
    };

    vec![
        SyncTask {
            id: "extrato",
            file_name: "SI_EXTRATO_CLIENTE_HISTORICO.json",
            endpoint: "/customer-extract-history",
            query: vec![
                ("startDueDate", start_date.to_string()),
                ("endDueDate", end_date.to_string()),
            ],
        },
        income("income_competencia", "SI_DATACOMPETPARCELAS.json", "B"),
        income("income_pagto", "SI_DATAPAGTO.json", "P"),
        income("income_emissao", "SI_DATAEMISSAO.json", "I"),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_tasks() {
        let tasks = default_tasks("2024-01-01", "2024-12-31");
        let ids: Vec<_> = tasks.iter().map(|t| t.id).collect();
        assert_eq!(
            ids,
            ["extrato", "income_competencia", "income_pagto", "income_emissao"]
        );

        assert_eq!(tasks[0].query[0], ("startDueDate", "2024-01-01".to_string()));
        assert_eq!(tasks[2].endpoint, "/income");
        assert_eq!(tasks[2].query[2], ("selectionType", "P".to_string()));
        assert_eq!(tasks[3].file_name, "SI_DATAEMISSAO.json");
    }
}
