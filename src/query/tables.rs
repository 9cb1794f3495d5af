//! Column registries for every grid the backend serves.
//!
//! Expressions are emitted into SQL verbatim; they name physical columns of the
//! table (or aliases of the grouped query) and never come from a request.

use crate::query::registry::{ColumnDef, ColumnMatching, ColumnRegistry};

const FULL_KEPLERO: &[ColumnDef] = &[
    ColumnDef::number("id", "Id"),
    ColumnDef::text("numeroProtocollo", "NumeroProtocollo"),
    ColumnDef::text("utenteLiquidatore", "UtenteLiquidatore"),
    ColumnDef::text("dataPresentazione", "DataPresentazione"),
    ColumnDef::text("dataInserimento", "DataInserimento"),
    ColumnDef::text("modified", "Modified"),
    ColumnDef::text("descrizioneGruppoTariffa", "DescrizioneGruppoTariffa"),
    ColumnDef::text("formaAssistenza", "FormaAssistenza"),
    ColumnDef::text("importoRichiesto", "ImportoRichiesto"),
    ColumnDef::text("importoRiconosciuto", "ImportoRiconosciuto"),
    ColumnDef::text("dataPagamento", "DataPagamento"),
    ColumnDef::text("cognomePersona", "CognomePersona"),
    ColumnDef::text("nomePersona", "NomePersona"),
    ColumnDef::text("cognomeBeneficiario", "CognomeBeneficiario"),
    ColumnDef::text("nomeBeneficiario", "NomeBeneficiario"),
    ColumnDef::text("unisalInviato", "UnisalInviato"),
    ColumnDef::text("statoPratica", "StatoPratica"),
];

const SECOND_TABLE: &[ColumnDef] = &[
    ColumnDef::number("id", "Id"),
    ColumnDef::text("codice", "Codice"),
    ColumnDef::text("descrizione", "Descrizione"),
    ColumnDef::text("categoria", "Categoria"),
    ColumnDef::number("quantita", "Quantita"),
    ColumnDef::date("dataRiferimento", "DataRiferimento"),
    ColumnDef::text("note", "Note"),
];

const KEPLERO_COMPARE: &[ColumnDef] = &[
    ColumnDef::number("itemId", "ItemId"),
    ColumnDef::text("protocollo", "Protocollo"),
    ColumnDef::text("coda", "Coda"),
    ColumnDef::text("statoPratica", "StatoPratica"),
    ColumnDef::text("stato", "Stato"),
    ColumnDef::text("esito", "Esito"),
    ColumnDef::date("dataEsito", "DataEsito"),
    ColumnDef::text("statoPratica_Keplero", "StatoPratica_Keplero"),
    ColumnDef::text("statoPraticaKeplero", "StatoPratica_Keplero"),
    ColumnDef::number("riga", "Riga"),
];

// `g` is the per-protocol aggregate, `r` the representative source row.
const PROTOCOLLO_GROUPED: &[ColumnDef] = &[
    ColumnDef::text("numeroProtocollo", "g.NumeroProtocollo"),
    ColumnDef::number("count", "g.RowCount"),
    ColumnDef::text("utenteLiquidatore", "r.UtenteLiquidatore"),
    ColumnDef::text("dataPresentazione", "r.DataPresentazione"),
    ColumnDef::text("statoPratica", "r.StatoPratica"),
    ColumnDef::text("formaAssistenza", "r.FormaAssistenza"),
];

/// Grids served by the backend, each with its own registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grid {
    FullKeplero,
    SecondTable,
    KepleroCompare,
    ProtocolloGrouped,
}

impl Grid {
    pub fn registry(self, matching: ColumnMatching) -> ColumnRegistry {
        let base = match self {
            Grid::FullKeplero => ColumnRegistry::new(FULL_KEPLERO, "Id"),
            Grid::SecondTable => ColumnRegistry::new(SECOND_TABLE, "Id"),
            Grid::KepleroCompare => ColumnRegistry::new(KEPLERO_COMPARE, "Protocollo"),
            Grid::ProtocolloGrouped => {
                ColumnRegistry::new(PROTOCOLLO_GROUPED, "g.NumeroProtocollo")
            }
        };
        base.with_matching(matching)
    }
}

/// Per-grid column lookup behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registries {
    pub full_keplero: ColumnRegistry,
    pub second_table: ColumnRegistry,
    pub keplero_compare: ColumnRegistry,
    pub protocollo_grouped: ColumnRegistry,
}

impl Registries {
    pub fn new(
        full_keplero: ColumnMatching,
        second_table: ColumnMatching,
        keplero_compare: ColumnMatching,
        protocollo_grouped: ColumnMatching,
    ) -> Self {
        Self {
            full_keplero: Grid::FullKeplero.registry(full_keplero),
            second_table: Grid::SecondTable.registry(second_table),
            keplero_compare: Grid::KepleroCompare.registry(keplero_compare),
            protocollo_grouped: Grid::ProtocolloGrouped.registry(protocollo_grouped),
        }
    }

    pub fn get(&self, grid: Grid) -> &ColumnRegistry {
        match grid {
            Grid::FullKeplero => &self.full_keplero,
            Grid::SecondTable => &self.second_table,
            Grid::KepleroCompare => &self.keplero_compare,
            Grid::ProtocolloGrouped => &self.protocollo_grouped,
        }
    }
}

impl Default for Registries {
    /// Exact lookup everywhere except the comparison table.
    fn default() -> Self {
        Self::new(
            ColumnMatching::Exact,
            ColumnMatching::Exact,
            ColumnMatching::IgnoreCase,
            ColumnMatching::Exact,
        )
    }
}
