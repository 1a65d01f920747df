// src/services/distribution_service.rs

use std::collections::HashMap;

use serde::Serialize;
use sqlx::PgPool;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::{EstructuraRepository, LeadRepository, UsuarioRepository},
    models::estructura::TipoEstructura,
    models::lead::EstadoLead,
    services::hierarchy::Jerarquia,
};

// =============================================================================
//  O ALGORITMO DE DISTRIBUIÇÃO JUSTA (duas fases, puro)
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asignacion {
    pub lead_id: i64,
    pub usuario_id: Uuid,
}

#[derive(Debug, Clone)]
pub struct PlanDistribucion {
    pub asignaciones: Vec<Asignacion>,
    // Leads que ninguém pôde receber (todos os agentes no teto)
    pub sobrantes: Vec<i64>,
}

impl PlanDistribucion {
    /// Contagem por agente, na ordem de entrada dos agentes
    pub fn por_agente(&self, agentes: &[Uuid]) -> Vec<(Uuid, usize)> {
        let mut conteo: HashMap<Uuid, usize> = HashMap::new();
        for asignacion in &self.asignaciones {
            *conteo.entry(asignacion.usuario_id).or_default() += 1;
        }
        agentes
            .iter()
            .map(|a| (*a, conteo.get(a).copied().unwrap_or(0)))
            .collect()
    }
}

/// Particiona a fila de leads entre os agentes, em duas fases:
///
/// 1. Base: `base = min(teto, total_leads / total_agentes)` leads para cada
///    agente, na ordem de entrada, consumindo a fila pela frente.
/// 2. Resto: round-robin desde o primeiro agente, UM lead por visita a quem
///    ainda está abaixo do teto, até esgotar a fila ou todos baterem o teto.
///
/// A ordem de leads e agentes é responsabilidade de quem chama (e precisa
/// ser estável). Sobras não são erro: viram relatório.
pub fn fair_distribution(
    leads: &[i64],
    agentes: &[Uuid],
    max_por_agente: usize,
) -> PlanDistribucion {
    let mut asignaciones = Vec::with_capacity(leads.len());

    if agentes.is_empty() {
        return PlanDistribucion {
            asignaciones,
            sobrantes: leads.to_vec(),
        };
    }

    let mut cupos = vec![0usize; agentes.len()];
    let mut frente = 0usize;

    // Fase 1: a base igualitária
    let base = (leads.len() / agentes.len()).min(max_por_agente);
    for (i, agente) in agentes.iter().enumerate() {
        for _ in 0..base {
            asignaciones.push(Asignacion {
                lead_id: leads[frente],
                usuario_id: *agente,
            });
            frente += 1;
        }
        cupos[i] = base;
    }

    // Fase 2: o resto, round-robin a partir do primeiro agente
    let mut hubo_progreso = true;
    while frente < leads.len() && hubo_progreso {
        hubo_progreso = false;
        for (i, agente) in agentes.iter().enumerate() {
            if frente >= leads.len() {
                break;
            }
            if cupos[i] < max_por_agente {
                asignaciones.push(Asignacion {
                    lead_id: leads[frente],
                    usuario_id: *agente,
                });
                cupos[i] += 1;
                frente += 1;
                hubo_progreso = true;
            }
        }
    }

    PlanDistribucion {
        asignaciones,
        sobrantes: leads[frente..].to_vec(),
    }
}

/// Resolve o escopo da evacuação: a união das subárvores da empresa e do
/// país, validando o par antes. Metade do escopo é rejeitada na hora;
/// `None` = varredura global.
pub fn alcance_evacuacion(
    jerarquia: &Jerarquia,
    empresa_id: Option<i64>,
    pais_id: Option<i64>,
) -> Result<Option<Vec<i64>>, AppError> {
    match (empresa_id, pais_id) {
        (None, None) => Ok(None),

        (Some(empresa_id), Some(pais_id)) => {
            let empresa = jerarquia
                .get(empresa_id)
                .ok_or(AppError::EstructuraNotFound(empresa_id))?;
            let pais = jerarquia
                .get(pais_id)
                .ok_or(AppError::EstructuraNotFound(pais_id))?;
            if empresa.tipo != TipoEstructura::Empresa {
                return Err(AppError::AlcanceInvalido(format!(
                    "A estrutura {} não é uma Empresa.",
                    empresa_id
                )));
            }
            if pais.tipo != TipoEstructura::Paises {
                return Err(AppError::AlcanceInvalido(format!(
                    "A estrutura {} não é um País.",
                    pais_id
                )));
            }

            // União das duas subárvores
            let mut alcance = jerarquia.subtree_ids(empresa_id);
            alcance.extend(jerarquia.subtree_ids(pais_id));
            let mut alcance: Vec<i64> = alcance.into_iter().collect();
            alcance.sort_unstable();
            Ok(Some(alcance))
        }

        // Metade do escopo não é escopo
        _ => Err(AppError::AlcanceInvalido(
            "Informe empresa E país, ou nenhum dos dois (evacuação global).".to_string(),
        )),
    }
}

// =============================================================================
//  RELATÓRIOS (a saída das operações nunca é silenciosa)
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResultadoDistribucion {
    Completado,
    // No-ops lógicos: relatório informativo, não erro
    SinAgentes,
    SinLeads,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AsignacionPorAgente {
    pub usuario_id: Uuid,
    pub cantidad: usize,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReporteDistribucion {
    pub resultado: ResultadoDistribucion,
    pub total_leads: usize,
    pub total_agentes: usize,
    /// Efetivamente gravados no banco
    pub asignados: u64,
    /// Planejados mas perdidos na guarda condicional (outra rodada chegou antes)
    pub omitidos: u64,
    /// Ficaram sem dono por teto esgotado
    pub sobrantes: usize,
    pub por_agente: Vec<AsignacionPorAgente>,
}

impl ReporteDistribucion {
    fn vacio(resultado: ResultadoDistribucion) -> Self {
        Self {
            resultado,
            total_leads: 0,
            total_agentes: 0,
            asignados: 0,
            omitidos: 0,
            sobrantes: 0,
            por_agente: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReporteEvacuacion {
    pub total: usize,
    pub sin_llamar: usize,
    pub rechazado: usize,
}

// =============================================================================
//  O SERVIÇO
// =============================================================================

/// Política da rodada: teto por agente, janela de presença e o fallback
/// global (desligado por padrão; só entra em cena por opt-in explícito).
#[derive(Debug, Clone)]
pub struct PoliticaDistribucion {
    pub max_por_agente: usize,
    pub ventana_minutos: i64,
    pub fallback_global: bool,
}

impl Default for PoliticaDistribucion {
    fn default() -> Self {
        Self {
            max_por_agente: 10,
            ventana_minutos: 5,
            fallback_global: false,
        }
    }
}

#[derive(Clone)]
pub struct DistributionService {
    estructura_repo: EstructuraRepository,
    usuario_repo: UsuarioRepository,
    lead_repo: LeadRepository,
    pool: PgPool,
    politica: PoliticaDistribucion,
}

impl DistributionService {
    pub fn new(
        estructura_repo: EstructuraRepository,
        usuario_repo: UsuarioRepository,
        lead_repo: LeadRepository,
        pool: PgPool,
        politica: PoliticaDistribucion,
    ) -> Self {
        Self {
            estructura_repo,
            usuario_repo,
            lead_repo,
            pool,
            politica,
        }
    }

    /// Uma rodada de distribuição sob o escopo da estrutura dada
    /// (ela + todos os descendentes).
    pub async fn distribute(
        &self,
        estructura_id: i64,
        max_por_agente: Option<usize>,
        fallback_global: Option<bool>,
    ) -> Result<ReporteDistribucion, AppError> {
        let max = max_por_agente.unwrap_or(self.politica.max_por_agente);
        let fallback = fallback_global.unwrap_or(self.politica.fallback_global);

        // 1. Monta a árvore e resolve o escopo
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);
        if !jerarquia.contiene(estructura_id) {
            return Err(AppError::EstructuraNotFound(estructura_id));
        }
        let mut alcance: Vec<i64> = jerarquia.subtree_ids(estructura_id).into_iter().collect();
        alcance.sort_unstable();

        // 2. Agentes elegíveis (online, dentro da janela, no escopo)
        let mut agentes = self
            .usuario_repo
            .find_agentes_en_linea(&self.pool, Some(&alcance), self.politica.ventana_minutos)
            .await?;

        if agentes.is_empty() && fallback {
            // Política opt-in: sem agente no escopo, qualquer agente online serve
            tracing::warn!(
                "Sem agentes online no escopo da estrutura {}; aplicando fallback global",
                estructura_id
            );
            agentes = self
                .usuario_repo
                .find_agentes_en_linea(&self.pool, None, self.politica.ventana_minutos)
                .await?;
        }

        if agentes.is_empty() {
            return Ok(ReporteDistribucion::vacio(ResultadoDistribucion::SinAgentes));
        }

        // 3. A fila de leads do escopo
        let leads = self.lead_repo.find_pool(&self.pool, &alcance).await?;
        if leads.is_empty() {
            let mut reporte = ReporteDistribucion::vacio(ResultadoDistribucion::SinLeads);
            reporte.total_agentes = agentes.len();
            return Ok(reporte);
        }

        // 4. O plano (puro, determinístico sob ordem estável)
        let lead_ids: Vec<i64> = leads.iter().map(|l| l.id).collect();
        let agente_ids: Vec<Uuid> = agentes.iter().map(|u| u.id).collect();
        let plan = fair_distribution(&lead_ids, &agente_ids, max);

        // 5. Aplica o plano numa transação só: ou o lote inteiro entra,
        //    ou nada entra. A guarda `asignado_a IS NULL` fica por conta
        //    do repositório.
        let mut leads_por_agente: HashMap<Uuid, Vec<i64>> = HashMap::new();
        for asignacion in &plan.asignaciones {
            leads_por_agente
                .entry(asignacion.usuario_id)
                .or_default()
                .push(asignacion.lead_id);
        }

        let mut tx = self.pool.begin().await?;
        let mut asignados = 0u64;
        for agente_id in &agente_ids {
            if let Some(ids) = leads_por_agente.get(agente_id) {
                asignados += self
                    .lead_repo
                    .assign_si_libre(&mut *tx, ids, *agente_id)
                    .await?;
            }
        }
        tx.commit().await?;

        let omitidos = plan.asignaciones.len() as u64 - asignados;
        let por_agente = plan
            .por_agente(&agente_ids)
            .into_iter()
            .map(|(usuario_id, cantidad)| AsignacionPorAgente {
                usuario_id,
                cantidad,
            })
            .collect();

        tracing::info!(
            "Distribuição na estrutura {}: {} leads, {} agentes, {} atribuídos, {} sobraram",
            estructura_id,
            lead_ids.len(),
            agente_ids.len(),
            asignados,
            plan.sobrantes.len()
        );

        Ok(ReporteDistribucion {
            resultado: ResultadoDistribucion::Completado,
            total_leads: lead_ids.len(),
            total_agentes: agente_ids.len(),
            asignados,
            omitidos,
            sobrantes: plan.sobrantes.len(),
            por_agente,
        })
    }

    /// Varredura de evacuação: devolve à fila os leads SIN_LLAMAR/RECHAZADO
    /// dos agentes do escopo (par empresa + país) ou do sistema inteiro.
    /// Idempotente: limpar atribuição já nula não muda linha nenhuma.
    pub async fn evacuate(
        &self,
        empresa_id: Option<i64>,
        pais_id: Option<i64>,
    ) -> Result<ReporteEvacuacion, AppError> {
        let jerarquia = Jerarquia::new(self.estructura_repo.find_all(&self.pool).await?);

        let estados = match alcance_evacuacion(&jerarquia, empresa_id, pais_id)? {
            None => self.lead_repo.clear_assignments(&self.pool, None).await?,

            Some(alcance) => {
                let usuarios = self
                    .usuario_repo
                    .find_por_estructuras(&self.pool, &alcance)
                    .await?;
                if usuarios.is_empty() {
                    return Ok(ReporteEvacuacion {
                        total: 0,
                        sin_llamar: 0,
                        rechazado: 0,
                    });
                }
                let usuario_ids: Vec<Uuid> = usuarios.iter().map(|u| u.id).collect();

                self.lead_repo
                    .clear_assignments(&self.pool, Some(&usuario_ids))
                    .await?
            }
        };

        let sin_llamar = estados
            .iter()
            .filter(|e| **e == EstadoLead::SinLlamar)
            .count();
        let rechazado = estados
            .iter()
            .filter(|e| **e == EstadoLead::Rechazado)
            .count();

        tracing::info!(
            "Evacuação: {} leads devolvidos à fila ({} SIN_LLAMAR, {} RECHAZADO)",
            estados.len(),
            sin_llamar,
            rechazado
        );

        Ok(ReporteEvacuacion {
            total: estados.len(),
            sin_llamar,
            rechazado,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::estructura::Estructura;
    use chrono::Utc;

    fn agentes(n: usize) -> Vec<Uuid> {
        (0..n).map(|_| Uuid::new_v4()).collect()
    }

    fn leads(n: i64) -> Vec<i64> {
        (1..=n).collect()
    }

    #[test]
    fn distribuicao_justa_23_leads_3_agentes_teto_10() {
        let ags = agentes(3);
        let plan = fair_distribution(&leads(23), &ags, 10);

        // Base 7 para todos, resto 1 para os dois primeiros: 8, 8, 7
        let conteo = plan.por_agente(&ags);
        assert_eq!(conteo[0].1, 8);
        assert_eq!(conteo[1].1, 8);
        assert_eq!(conteo[2].1, 7);

        assert_eq!(plan.asignaciones.len(), 23);
        assert!(plan.sobrantes.is_empty());
    }

    #[test]
    fn teto_esgotado_deixa_sobras_reportadas() {
        let ags = agentes(3);
        let plan = fair_distribution(&leads(35), &ags, 10);

        assert_eq!(plan.asignaciones.len(), 30);
        assert_eq!(plan.sobrantes.len(), 5);
        for (_, cantidad) in plan.por_agente(&ags) {
            assert_eq!(cantidad, 10);
        }
        // As sobras são exatamente o fim da fila
        assert_eq!(plan.sobrantes, vec![31, 32, 33, 34, 35]);
    }

    #[test]
    fn menos_leads_que_agentes_vai_um_para_cada_um_do_inicio() {
        let ags = agentes(5);
        let plan = fair_distribution(&leads(2), &ags, 10);

        let conteo = plan.por_agente(&ags);
        assert_eq!(conteo[0].1, 1);
        assert_eq!(conteo[1].1, 1);
        assert_eq!(conteo[2].1, 0);
        assert_eq!(conteo[3].1, 0);
        assert_eq!(conteo[4].1, 0);
        assert!(plan.sobrantes.is_empty());
    }

    #[test]
    fn ninguem_passa_do_teto() {
        let ags = agentes(4);
        let plan = fair_distribution(&leads(100), &ags, 7);

        for (_, cantidad) in plan.por_agente(&ags) {
            assert!(cantidad <= 7);
        }
        assert_eq!(plan.asignaciones.len(), 28);
        assert_eq!(plan.sobrantes.len(), 72);
    }

    #[test]
    fn fila_consumida_pela_frente_e_em_ordem() {
        let ags = agentes(2);
        let plan = fair_distribution(&leads(5), &ags, 10);

        // Base 2 para cada: agente A leva 1,2; agente B leva 3,4;
        // o resto (5) volta para o agente A
        let de_a: Vec<i64> = plan
            .asignaciones
            .iter()
            .filter(|a| a.usuario_id == ags[0])
            .map(|a| a.lead_id)
            .collect();
        let de_b: Vec<i64> = plan
            .asignaciones
            .iter()
            .filter(|a| a.usuario_id == ags[1])
            .map(|a| a.lead_id)
            .collect();

        assert_eq!(de_a, vec![1, 2, 5]);
        assert_eq!(de_b, vec![3, 4]);
    }

    #[test]
    fn sem_agentes_tudo_vira_sobra() {
        let plan = fair_distribution(&leads(4), &[], 10);
        assert!(plan.asignaciones.is_empty());
        assert_eq!(plan.sobrantes, vec![1, 2, 3, 4]);
    }

    #[test]
    fn sem_leads_plano_vazio() {
        let ags = agentes(3);
        let plan = fair_distribution(&[], &ags, 10);
        assert!(plan.asignaciones.is_empty());
        assert!(plan.sobrantes.is_empty());
    }

    #[test]
    fn teto_zero_nao_atribui_nada() {
        let ags = agentes(3);
        let plan = fair_distribution(&leads(9), &ags, 0);
        assert!(plan.asignaciones.is_empty());
        assert_eq!(plan.sobrantes.len(), 9);
    }

    #[test]
    fn mesmo_insumo_mesmo_plano() {
        // Determinismo: ordem estável de entrada => plano idêntico
        let ags = agentes(3);
        let plan_a = fair_distribution(&leads(17), &ags, 6);
        let plan_b = fair_distribution(&leads(17), &ags, 6);
        assert_eq!(plan_a.asignaciones, plan_b.asignaciones);
        assert_eq!(plan_a.sobrantes, plan_b.sobrantes);
    }

    // --- Escopo da evacuação ---

    fn nodo(id: i64, tipo: TipoEstructura, parent_id: Option<i64>) -> Estructura {
        Estructura {
            id,
            tipo,
            nombre: format!("Nodo {id}"),
            nombre_personalizado: None,
            parent_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    // Duas empresas, cada uma com um país e uma divisão embaixo
    fn arbol_evacuacion() -> Jerarquia {
        Jerarquia::new(vec![
            nodo(1, TipoEstructura::Empresa, None),
            nodo(2, TipoEstructura::Paises, Some(1)),
            nodo(3, TipoEstructura::Division, Some(2)),
            nodo(10, TipoEstructura::Empresa, None),
            nodo(11, TipoEstructura::Paises, Some(10)),
            nodo(12, TipoEstructura::Division, Some(11)),
        ])
    }

    #[test]
    fn sem_par_de_escopo_a_evacuacao_e_global() {
        let jerarquia = arbol_evacuacion();
        let alcance = alcance_evacuacion(&jerarquia, None, None).unwrap();
        assert!(alcance.is_none());
    }

    #[test]
    fn escopo_valido_e_a_uniao_das_duas_subarvores() {
        let jerarquia = arbol_evacuacion();
        let alcance = alcance_evacuacion(&jerarquia, Some(1), Some(2)).unwrap();
        // A subárvore da empresa 1 já contém o país 2: a união não duplica
        assert_eq!(alcance, Some(vec![1, 2, 3]));

        // A outra empresa fica fora do escopo
        let alcance = alcance_evacuacion(&jerarquia, Some(10), Some(11)).unwrap();
        assert_eq!(alcance, Some(vec![10, 11, 12]));
    }

    #[test]
    fn metade_do_escopo_e_rejeitada() {
        let jerarquia = arbol_evacuacion();
        assert!(matches!(
            alcance_evacuacion(&jerarquia, Some(1), None),
            Err(AppError::AlcanceInvalido(_))
        ));
        assert!(matches!(
            alcance_evacuacion(&jerarquia, None, Some(2)),
            Err(AppError::AlcanceInvalido(_))
        ));
    }

    #[test]
    fn tipo_errado_no_par_e_rejeitado() {
        let jerarquia = arbol_evacuacion();
        // 3 é Division, não Empresa
        assert!(matches!(
            alcance_evacuacion(&jerarquia, Some(3), Some(2)),
            Err(AppError::AlcanceInvalido(_))
        ));
        // 1 é Empresa, não País
        assert!(matches!(
            alcance_evacuacion(&jerarquia, Some(1), Some(1)),
            Err(AppError::AlcanceInvalido(_))
        ));
    }

    #[test]
    fn escopo_com_no_inexistente_e_not_found() {
        let jerarquia = arbol_evacuacion();
        assert!(matches!(
            alcance_evacuacion(&jerarquia, Some(99), Some(2)),
            Err(AppError::EstructuraNotFound(99))
        ));
    }
}
