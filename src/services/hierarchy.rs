// src/services/hierarchy.rs

use std::collections::{HashMap, HashSet, VecDeque};

use crate::models::estructura::{Estructura, JerarquiaStats};
use crate::models::usuario::Usuario;

// =============================================================================
//  O MOTOR DE HIERARQUIA
// =============================================================================
// Árvore organizacional em memória, montada UMA vez por requisição a partir
// do fetch completo de `estructuras`. Daqui para frente tudo é função pura:
// nenhuma mutação, nenhum I/O. Quem persiste mudanças é a camada de serviço.
//
// Funções totais: um parent_id que aponta para um nó inexistente trunca a
// cadeia em vez de virar erro. Um conjunto de visitados protege as travessias
// contra dados malformados vindos do banco.

pub struct Jerarquia {
    nodos: HashMap<i64, Estructura>,
    // Índice parent -> filhos, para descer a árvore em O(n) e não O(n²)
    hijos: HashMap<i64, Vec<i64>>,
}

impl Jerarquia {
    pub fn new(estructuras: Vec<Estructura>) -> Self {
        let mut nodos = HashMap::with_capacity(estructuras.len());
        let mut hijos: HashMap<i64, Vec<i64>> = HashMap::new();

        for estructura in estructuras {
            if let Some(parent_id) = estructura.parent_id {
                hijos.entry(parent_id).or_default().push(estructura.id);
            }
            nodos.insert(estructura.id, estructura);
        }

        // Ordem estável dos filhos: travessias determinísticas
        for lista in hijos.values_mut() {
            lista.sort_unstable();
        }

        Self { nodos, hijos }
    }

    pub fn get(&self, id: i64) -> Option<&Estructura> {
        self.nodos.get(&id)
    }

    pub fn contiene(&self, id: i64) -> bool {
        self.nodos.contains_key(&id)
    }

    /// Cadeia de ancestrais do nó, da raiz para baixo (o nó NÃO entra).
    /// Pai ausente ou laço nos dados: a cadeia simplesmente termina ali.
    pub fn ancestor_chain(&self, id: i64) -> Vec<&Estructura> {
        let mut cadena = Vec::new();
        let mut visitados = HashSet::new();
        visitados.insert(id);

        let mut actual = self.nodos.get(&id).and_then(|n| n.parent_id);
        while let Some(parent_id) = actual {
            if !visitados.insert(parent_id) {
                break;
            }
            match self.nodos.get(&parent_id) {
                Some(padre) => {
                    cadena.push(padre);
                    actual = padre.parent_id;
                }
                None => break,
            }
        }

        cadena.reverse();
        cadena
    }

    /// Todos os nós cuja cadeia de pais passa por `id` (o nó NÃO entra).
    pub fn descendants(&self, id: i64) -> Vec<&Estructura> {
        let mut resultado = Vec::new();
        let mut visitados = HashSet::new();
        visitados.insert(id);

        let mut fila: VecDeque<i64> = self
            .hijos
            .get(&id)
            .map(|h| h.iter().copied().collect())
            .unwrap_or_default();

        while let Some(nodo_id) = fila.pop_front() {
            if !visitados.insert(nodo_id) {
                continue;
            }
            if let Some(estructura) = self.nodos.get(&nodo_id) {
                resultado.push(estructura);
            }
            if let Some(siguientes) = self.hijos.get(&nodo_id) {
                fila.extend(siguientes.iter().copied());
            }
        }

        resultado
    }

    /// Valida a aresta proposta `hijo -> padre` ANTES de persistir.
    /// Regras: pai nulo sempre vale; senão o pai precisa de camada
    /// estritamente menor E não pode ser descendente do filho (ciclo).
    pub fn is_valid_link(&self, hijo_id: i64, padre_id: Option<i64>) -> bool {
        let Some(padre_id) = padre_id else {
            return true;
        };
        if padre_id == hijo_id {
            return false;
        }
        let (Some(hijo), Some(padre)) = (self.nodos.get(&hijo_id), self.nodos.get(&padre_id))
        else {
            return false;
        };
        if padre.tipo.tier() >= hijo.tipo.tier() {
            return false;
        }
        // Guarda de ciclo
        !self.descendants(hijo_id).iter().any(|d| d.id == padre_id)
    }

    /// O fecho herdado: ancestrais + descendentes + o próprio nó.
    /// É a "cascata" de visibilidade dos cargos multi-estrutura.
    pub fn inherited_closure(&self, id: i64) -> HashSet<i64> {
        let mut ids = HashSet::new();
        ids.insert(id);
        for ancestro in self.ancestor_chain(id) {
            ids.insert(ancestro.id);
        }
        for descendiente in self.descendants(id) {
            ids.insert(descendiente.id);
        }
        ids
    }

    /// Escopo de distribuição/evacuação: o nó + todos os descendentes.
    pub fn subtree_ids(&self, id: i64) -> HashSet<i64> {
        let mut ids: HashSet<i64> = self.descendants(id).iter().map(|d| d.id).collect();
        ids.insert(id);
        ids
    }

    /// Candidatos a novo pai: camada estritamente menor, fora da descendência
    /// do nó (guarda de ciclo). Alimenta o seletor de reparent da UI.
    pub fn possible_parents(&self, id: i64) -> Vec<&Estructura> {
        let Some(nodo) = self.nodos.get(&id) else {
            return Vec::new();
        };
        let descendientes: HashSet<i64> = self.descendants(id).iter().map(|d| d.id).collect();

        let mut candidatos: Vec<&Estructura> = self
            .nodos
            .values()
            .filter(|c| {
                c.id != id && c.tipo.tier() < nodo.tipo.tier() && !descendientes.contains(&c.id)
            })
            .collect();

        candidatos.sort_by_key(|e| e.id);
        candidatos
    }

    /// Contagens descritivas do nó
    pub fn stats(&self, id: i64) -> JerarquiaStats {
        let ancestros = self.ancestor_chain(id).len();
        let descendientes = self.descendants(id).len();
        JerarquiaStats {
            nivel: ancestros,
            ancestros,
            descendientes,
            total_enlaces: ancestros + descendientes + 1,
        }
    }
}

/// O conjunto de estruturas que o usuário efetivamente enxerga, dado a
/// árvore atual: cargos multi-estrutura herdam o fecho completo da sua
/// estrutura direta; os demais enxergam só a direta. Sem estrutura direta,
/// nada.
pub fn visibilidad_para(jerarquia: &Jerarquia, usuario: &Usuario) -> Vec<i64> {
    let Some(directa) = usuario.estructura_id else {
        return Vec::new();
    };
    if usuario.cargo.es_multi_estructura() {
        let mut ids: Vec<i64> = jerarquia.inherited_closure(directa).into_iter().collect();
        ids.sort_unstable();
        ids
    } else {
        vec![directa]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::estructura::TipoEstructura;
    use crate::models::usuario::Cargo;
    use chrono::Utc;
    use uuid::Uuid;

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

    // Árvore de referência:
    //   1 Empresa
    //   ├── 2 Paises (España)
    //   │   └── 3 Division
    //   │       └── 4 Organizaciones
    //   │           └── 5 Jefaturas
    //   │               └── 8 SubOrganizacion
    //   └── 6 Paises (México)
    //       └── 7 Filial
    fn arbol() -> Jerarquia {
        Jerarquia::new(vec![
            nodo(1, TipoEstructura::Empresa, None),
            nodo(2, TipoEstructura::Paises, Some(1)),
            nodo(3, TipoEstructura::Division, Some(2)),
            nodo(4, TipoEstructura::Organizaciones, Some(3)),
            nodo(5, TipoEstructura::Jefaturas, Some(4)),
            nodo(6, TipoEstructura::Paises, Some(1)),
            nodo(7, TipoEstructura::Filial, Some(6)),
            nodo(8, TipoEstructura::SubOrganizacion, Some(5)),
        ])
    }

    #[test]
    fn cadeia_de_ancestrais_vem_da_raiz_para_baixo() {
        let jerarquia = arbol();
        let ids: Vec<i64> = jerarquia.ancestor_chain(8).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn raiz_nao_tem_ancestrais() {
        let jerarquia = arbol();
        assert!(jerarquia.ancestor_chain(1).is_empty());
    }

    #[test]
    fn pai_ausente_trunca_a_cadeia_sem_erro() {
        // O nó 3 aponta para o pai 99, que não existe no conjunto
        let jerarquia = Jerarquia::new(vec![
            nodo(2, TipoEstructura::Division, Some(3)),
            nodo(3, TipoEstructura::Paises, Some(99)),
        ]);
        let ids: Vec<i64> = jerarquia.ancestor_chain(2).iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![3]);
    }

    #[test]
    fn descendentes_cobrem_toda_a_subarvore() {
        let jerarquia = arbol();
        let mut ids: Vec<i64> = jerarquia.descendants(2).iter().map(|e| e.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![3, 4, 5, 8]);
    }

    #[test]
    fn nenhum_no_e_descendente_de_si_mesmo() {
        let jerarquia = arbol();
        for id in 1..=8 {
            assert!(
                !jerarquia.descendants(id).iter().any(|d| d.id == id),
                "nó {id} apareceu na própria descendência"
            );
        }
    }

    #[test]
    fn fecho_herdado_inclui_o_proprio_no_ancestrais_e_descendentes() {
        let jerarquia = arbol();
        let clausura = jerarquia.inherited_closure(4);
        let esperado: HashSet<i64> = [1, 2, 3, 4, 5, 8].into_iter().collect();
        assert_eq!(clausura, esperado);
    }

    #[test]
    fn simetria_do_fecho_cada_ancestral_ve_o_no_como_descendente() {
        let jerarquia = arbol();
        for id in 1..=8 {
            assert!(jerarquia.inherited_closure(id).contains(&id));
            for ancestro in jerarquia.ancestor_chain(id) {
                assert!(
                    jerarquia.descendants(ancestro.id).iter().any(|d| d.id == id),
                    "nó {id} não aparece nos descendentes do ancestral {}",
                    ancestro.id
                );
            }
        }
    }

    #[test]
    fn vinculo_com_pai_nulo_e_sempre_valido() {
        let jerarquia = arbol();
        assert!(jerarquia.is_valid_link(4, None));
    }

    #[test]
    fn vinculo_rejeitado_quando_camada_do_pai_nao_e_menor() {
        let jerarquia = arbol();
        // Paises (1) sob Division (2): pai de camada maior
        assert!(!jerarquia.is_valid_link(2, Some(3)));
        // Paises sob Paises: camadas iguais
        assert!(!jerarquia.is_valid_link(2, Some(6)));
    }

    #[test]
    fn vinculo_rejeitado_quando_o_pai_proposto_e_descendente() {
        // Forjamos um descendente de camada menor que o nó para isolar a
        // guarda de ciclo da regra de camadas
        let jerarquia = Jerarquia::new(vec![
            nodo(1, TipoEstructura::Division, None),
            nodo(2, TipoEstructura::Paises, Some(1)),
        ]);
        assert!(!jerarquia.is_valid_link(1, Some(2)));
    }

    #[test]
    fn vinculo_rejeitado_para_si_mesmo_ou_no_desconhecido() {
        let jerarquia = arbol();
        assert!(!jerarquia.is_valid_link(4, Some(4)));
        assert!(!jerarquia.is_valid_link(4, Some(99)));
        assert!(!jerarquia.is_valid_link(99, Some(1)));
    }

    #[test]
    fn possiveis_pais_excluem_descendentes_e_camadas_maiores_ou_iguais() {
        let jerarquia = arbol();
        let ids: Vec<i64> = jerarquia.possible_parents(3).iter().map(|e| e.id).collect();
        // Para a Division 3: só Empresa 1 e os dois Paises (2 e 6)
        assert_eq!(ids, vec![1, 2, 6]);

        // Para a raiz Empresa não sobra candidato
        assert!(jerarquia.possible_parents(1).is_empty());
    }

    #[test]
    fn subarvore_inclui_o_proprio_no() {
        let jerarquia = arbol();
        let alcance = jerarquia.subtree_ids(6);
        let esperado: HashSet<i64> = [6, 7].into_iter().collect();
        assert_eq!(alcance, esperado);
    }

    #[test]
    fn estatisticas_contam_nivel_ancestrais_e_descendentes() {
        let jerarquia = arbol();
        let stats = jerarquia.stats(4);
        assert_eq!(
            stats,
            JerarquiaStats {
                nivel: 3,
                ancestros: 3,
                descendientes: 2,
                total_enlaces: 6,
            }
        );
    }

    #[test]
    fn no_desconhecido_degrada_para_contagens_vazias() {
        let jerarquia = arbol();
        assert!(jerarquia.ancestor_chain(99).is_empty());
        assert!(jerarquia.descendants(99).is_empty());
        assert!(jerarquia.possible_parents(99).is_empty());
        let stats = jerarquia.stats(99);
        assert_eq!(stats.total_enlaces, 1);
    }

    fn usuario(cargo: Cargo, estructura_id: Option<i64>) -> Usuario {
        Usuario {
            id: Uuid::new_v4(),
            nombre: "Ana".to_string(),
            email: "ana@crm.test".to_string(),
            cargo,
            estructura_id,
            en_linea: true,
            ultima_conexion: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn visibilidade_multi_estructura_e_o_fecho_completo() {
        let jerarquia = arbol();
        let director = usuario(Cargo::DirectorZona, Some(4));
        assert_eq!(
            visibilidad_para(&jerarquia, &director),
            vec![1, 2, 3, 4, 5, 8]
        );
    }

    #[test]
    fn visibilidade_comum_e_so_a_estrutura_direta() {
        let jerarquia = arbol();
        let agente = usuario(Cargo::Agente, Some(4));
        assert_eq!(visibilidad_para(&jerarquia, &agente), vec![4]);
    }

    #[test]
    fn usuario_sem_estrutura_nao_enxerga_nada() {
        let jerarquia = arbol();
        let ceo = usuario(Cargo::Ceo, None);
        assert!(visibilidad_para(&jerarquia, &ceo).is_empty());
    }

    #[test]
    fn dados_com_laco_nao_travam_as_travessias() {
        // Laço 1 <-> 2 forjado direto nos dados (o banco nunca deveria
        // produzir isso; o motor apenas não pode entrar em loop)
        let jerarquia = Jerarquia::new(vec![
            nodo(1, TipoEstructura::Paises, Some(2)),
            nodo(2, TipoEstructura::Division, Some(1)),
        ]);
        assert_eq!(jerarquia.ancestor_chain(1).len(), 1);
        assert_eq!(jerarquia.descendants(1).len(), 1);
    }
}
