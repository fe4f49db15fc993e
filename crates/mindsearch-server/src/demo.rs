use std::collections::VecDeque;
use std::time::Duration;

use serde_json::json;

use mindsearch_core::agent::{Agent, AgentInput, StepIter};
use mindsearch_core::error::AgentError;
use mindsearch_core::event::StepEvent;
use mindsearch_core::graph::{AgentStatus, ChildRef, GraphState, ROOT};

use crate::config::Lang;

const MAX_SUB_QUESTIONS: usize = 4;
const RESPONSE_NODE: &str = "response";

/// Offline planning agent used when no model backend is wired in.
///
/// It splits the query into sub-questions, "searches" each one in turn and
/// finishes with a response node fed by every sub-question. Each step
/// blocks for `delay`, which makes the streaming visible in a browser.
#[derive(Debug, Clone)]
pub struct DemoSearchAgent {
    lang: Lang,
    delay: Duration,
}

impl DemoSearchAgent {
    pub fn new(lang: Lang, delay: Duration) -> Self {
        Self { lang, delay }
    }

    fn plan(&self, input: &AgentInput) -> Vec<StepEvent> {
        let questions = split_query(&input.query);
        let tag = |graph: GraphState, node: &str| {
            if input.multi_branch {
                StepEvent::branch(graph, node)
            } else {
                StepEvent::single(graph)
            }
        };

        let mut graph = GraphState::new(AgentStatus::Streaming);
        let mut steps = vec![StepEvent::single(graph.clone())];

        // Node names are generated; the question text lives in the node detail.
        let names: Vec<String> = (1..=questions.len()).map(|i| format!("q{i}")).collect();

        for (i, (name, question)) in names.iter().zip(&questions).enumerate() {
            let id = (i + 1) as u64;
            graph = graph.with_edge(
                ROOT,
                ChildRef::new(name.as_str(), AgentStatus::PluginStart, id),
            );
            steps.push(tag(graph.clone(), name.as_str()));

            set_edge_state(&mut graph, name, AgentStatus::End);
            graph = graph.with_node_detail(
                name.as_str(),
                json!({
                    "content": question,
                    "response": self.summary(question),
                    "search_results": [search_url(question)],
                }),
            );
            steps.push(tag(graph.clone(), name.as_str()));
        }

        let offset = questions.len() as u64;
        for (i, (name, question)) in names.iter().zip(&questions).enumerate() {
            graph = graph.with_edge(
                name.as_str(),
                ChildRef::new(RESPONSE_NODE, AgentStatus::End, offset + i as u64 + 1),
            );
            graph = graph.with_reference((i + 1).to_string(), search_url(question));
        }
        graph.state = AgentStatus::End;
        graph.response = Some(self.answer(&questions));
        steps.push(StepEvent::single(graph));

        steps
    }

    fn summary(&self, question: &str) -> String {
        match self.lang {
            Lang::Cn => format!("已检索: {question}"),
            Lang::En => format!("Searched the web for: {question}"),
        }
    }

    fn answer(&self, questions: &[String]) -> String {
        let cites: Vec<String> = (1..=questions.len()).map(|i| format!("[[{i}]]")).collect();
        match self.lang {
            Lang::Cn => format!("综合 {} 个子问题的检索结果 {}", questions.len(), cites.join("")),
            Lang::En => format!(
                "Answer combined from {} sub-question(s) {}",
                questions.len(),
                cites.join("")
            ),
        }
    }
}

impl Agent for DemoSearchAgent {
    fn stream_chat(&self, input: AgentInput) -> StepIter {
        Box::new(DemoIter {
            steps: self.plan(&input).into(),
            delay: self.delay,
        })
    }

    fn name(&self) -> &str {
        "demo"
    }
}

struct DemoIter {
    steps: VecDeque<StepEvent>,
    delay: Duration,
}

impl Iterator for DemoIter {
    type Item = Result<StepEvent, AgentError>;

    fn next(&mut self) -> Option<Self::Item> {
        let step = self.steps.pop_front()?;
        if !self.delay.is_zero() {
            std::thread::sleep(self.delay);
        }
        Some(Ok(step))
    }
}

fn set_edge_state(graph: &mut GraphState, child: &str, state: AgentStatus) {
    for edge in graph.adjacency.values_mut().flatten() {
        if edge.name == child {
            edge.state = state;
        }
    }
}

fn search_url(question: &str) -> String {
    let query: String = question
        .chars()
        .map(|c| if c.is_whitespace() { '+' } else { c })
        .collect();
    format!("https://search.example.com/?q={query}")
}

/// Split a query into at most four distinct sub-questions.
pub fn split_query(query: &str) -> Vec<String> {
    let mut out: Vec<String> = Vec::new();
    let parts = query
        .split(" and ")
        .flat_map(|s| s.split(['?', '？', ';', '；']))
        .map(str::trim)
        .filter(|s| !s.is_empty());

    for part in parts {
        if out.len() == MAX_SUB_QUESTIONS {
            break;
        }
        if !out.iter().any(|q| q == part) {
            out.push(part.to_string());
        }
    }
    if out.is_empty() {
        out.push(query.trim().to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use mindsearch_core::tree::TreeProjector;

    fn run(agent: &DemoSearchAgent, input: AgentInput) -> Vec<StepEvent> {
        agent.stream_chat(input).map(Result::unwrap).collect()
    }

    #[test]
    fn splits_on_separators() {
        assert_eq!(
            split_query("What is Rust? Who made it; when and why"),
            vec!["What is Rust", "Who made it", "when", "why"]
        );
    }

    #[test]
    fn split_dedupes_and_caps() {
        assert_eq!(split_query("a?a?b"), vec!["a", "b"]);
        assert_eq!(split_query("a;b;c;d;e").len(), MAX_SUB_QUESTIONS);
        assert_eq!(split_query("single question"), vec!["single question"]);
    }

    #[test]
    fn plan_ends_with_finished_snapshot() {
        let agent = DemoSearchAgent::new(Lang::En, Duration::ZERO);
        let steps = run(&agent, AgentInput::new("rust? tokio?"));

        // planning + 2 per question + final
        assert_eq!(steps.len(), 6);
        let last = steps.last().unwrap();
        assert!(last.finishes_run());
        assert!(steps[..5].iter().all(|s| !s.finishes_run()));
        assert_eq!(last.state().references.len(), 2);
        assert!(last.state().response.as_deref().unwrap().contains("[[2]]"));
    }

    #[test]
    fn final_snapshot_projects_with_shared_response() {
        let agent = DemoSearchAgent::new(Lang::Cn, Duration::ZERO);
        let steps = run(&agent, AgentInput::new("a? b?"));
        let tree = TreeProjector::default()
            .project(&steps.last().unwrap().state().adjacency)
            .unwrap();

        assert_eq!(tree.children.len(), 2);
        for child in &tree.children {
            assert_eq!(child.state, Some(AgentStatus::End));
            assert_eq!(child.children[0].name, RESPONSE_NODE);
        }
    }

    #[test]
    fn multi_branch_tags_question_steps() {
        let agent = DemoSearchAgent::new(Lang::En, Duration::ZERO);
        let steps = run(&agent, AgentInput::new("x? y?").with_multi_branch(true));

        assert_eq!(steps[0].branch_id(), None);
        assert_eq!(steps[1].branch_id(), Some("q1"));
        assert_eq!(steps[3].branch_id(), Some("q2"));
        assert_eq!(steps.last().unwrap().branch_id(), None);
    }

    #[test]
    fn reserved_words_in_query_still_project() {
        let agent = DemoSearchAgent::new(Lang::En, Duration::ZERO);
        let projector = TreeProjector::default();

        for query in ["root", "response? weather", "q1? q2"] {
            let steps = run(&agent, AgentInput::new(query));
            for step in &steps {
                assert!(
                    projector.project(&step.state().adjacency).is_ok(),
                    "query {query:?} produced an unprojectable snapshot"
                );
            }
        }

        let steps = run(&agent, AgentInput::new("response? weather"));
        let last = steps.last().unwrap().state();
        assert_eq!(last.nodes["q1"]["content"], "response");
        assert_eq!(last.nodes["q2"]["content"], "weather");
    }
}
